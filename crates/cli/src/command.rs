use anyhow::{anyhow, bail, Context, Result};

use scorelens_core::{PageSize, Percentile};
use scorelens_view::RowFilter;

/// One line of REPL input.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Next,
    Prev,
    Goto(u32),
    Size(PageSize),
    Percentile(Percentile),
    Retry,
    Filter(RowFilter),
    ClearFilter,
    Histogram,
    Show,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  n | p                 next / previous page
  g <page>              go to page
  size <20|50|100>      change page size (back to page 1)
  pct <90.0-99.9>       set anomaly percentile (applied after a short pause)
  retry                 replay the last failed request
  filter [anomalies] [score <lo> <hi>] [id <text>]
  clear                 remove the row filter
  hist                  score histogram for this page
  show                  redraw the current page
  quit";

pub fn parse(line: &str) -> Result<Command> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::Show);
    };
    let rest: Vec<&str> = words.collect();

    let command = match head.to_ascii_lowercase().as_str() {
        "n" | "next" => Command::Next,
        "p" | "prev" => Command::Prev,
        "g" | "goto" => {
            let page: u32 = arg(&rest, 0, "page")?
                .parse()
                .context("page must be a positive number")?;
            if page == 0 {
                bail!("page numbers start at 1");
            }
            Command::Goto(page)
        }
        "size" => {
            let size: u32 = arg(&rest, 0, "page size")?
                .parse()
                .context("page size must be a number")?;
            Command::Size(PageSize::new(size)?)
        }
        "pct" | "percentile" => {
            let value: f64 = arg(&rest, 0, "percentile")?
                .parse()
                .context("percentile must be a number")?;
            Command::Percentile(Percentile::new(value)?)
        }
        "retry" | "r" => Command::Retry,
        "filter" | "f" => Command::Filter(parse_filter(&rest)?),
        "clear" => Command::ClearFilter,
        "hist" | "histogram" => Command::Histogram,
        "show" | "ls" => Command::Show,
        "help" | "?" => Command::Help,
        "quit" | "exit" | "q" => Command::Quit,
        other => bail!("unknown command '{other}' (type 'help')"),
    };
    Ok(command)
}

fn arg<'a>(args: &[&'a str], index: usize, name: &str) -> Result<&'a str> {
    args.get(index)
        .copied()
        .ok_or_else(|| anyhow!("missing {name}"))
}

fn parse_filter(args: &[&str]) -> Result<RowFilter> {
    let mut filter = RowFilter::default();
    let mut i = 0;
    while i < args.len() {
        match args[i] {
            "anomalies" | "anomaly" => {
                filter.anomalies_only = true;
                i += 1;
            }
            "score" => {
                let low: f64 = arg(args, i + 1, "low score")?.parse().context("low score")?;
                let high: f64 = arg(args, i + 2, "high score")?.parse().context("high score")?;
                filter.score_range = Some((low, high));
                i += 3;
            }
            "id" => {
                filter.id_query = Some(arg(args, i + 1, "id text")?.to_string());
                i += 2;
            }
            other => bail!("unknown filter '{other}'"),
        }
    }
    if !filter.is_active() {
        bail!("empty filter (try 'filter anomalies')");
    }
    Ok(filter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn navigation_commands() {
        assert_eq!(parse("n").unwrap(), Command::Next);
        assert_eq!(parse(" P ").unwrap(), Command::Prev);
        assert_eq!(parse("g 4").unwrap(), Command::Goto(4));
        assert_eq!(parse("").unwrap(), Command::Show);
        assert!(parse("g 0").is_err());
        assert!(parse("g").is_err());
    }

    #[test]
    fn size_and_percentile_are_validated() {
        assert_eq!(parse("size 50").unwrap(), Command::Size(PageSize::new(50).unwrap()));
        assert!(parse("size 30").is_err());
        assert_eq!(
            parse("pct 97.5").unwrap(),
            Command::Percentile(Percentile::new(97.5).unwrap())
        );
        assert!(parse("pct 80").is_err());
        assert!(parse("pct abc").is_err());
    }

    #[test]
    fn filter_words_combine() {
        let Command::Filter(filter) = parse("filter anomalies score 0.2 0.8 id 12").unwrap() else {
            panic!("expected filter");
        };
        assert!(filter.anomalies_only);
        assert_eq!(filter.score_range, Some((0.2, 0.8)));
        assert_eq!(filter.id_query.as_deref(), Some("12"));

        assert!(parse("filter").is_err());
        assert!(parse("filter score 0.2").is_err());
        assert!(parse("filter colour red").is_err());
    }

    #[test]
    fn unknown_command() {
        assert!(parse("dance").is_err());
        assert_eq!(parse("quit").unwrap(), Command::Quit);
    }
}
