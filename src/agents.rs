use scraper::Html;
use serde::Serialize;
use tracing::{debug, warn};

use crate::aggregate::round2;
use crate::dom::{sel, text_of};
use crate::fetch::Fetcher;

/// Timespan filters the stats site accepts on a profile page.
pub const TIMESPANS: [&str; 4] = ["30d", "60d", "90d", "all"];

pub const OVERALL_AGENT: &str = "Overall";

/// One row of the per-agent stats table on a profile page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentStatLine {
    pub agent: String,
    pub rounds: u32,
    pub rating: f64,
    pub acs: f64,
    pub kd: f64,
    pub adr: f64,
    pub kast: String,
    pub kpr: f64,
    pub apr: f64,
    pub fkpr: f64,
    pub fdpr: f64,
    pub kills: u32,
    pub deaths: u32,
    pub assists: u32,
    pub first_kills: u32,
    pub first_deaths: u32,
}

/// The agent table of one timespan filter, with a computed overall row
/// appended when any agent rows parsed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimespanStats {
    pub timespan: String,
    pub agents: Vec<AgentStatLine>,
}

/// Fetch the profile page once per timespan filter and parse the agent
/// table. Best effort: a failed fetch or missing table just skips that
/// timespan.
pub fn collect_agent_stats(fetcher: &Fetcher, profile_url: &str) -> Vec<TimespanStats> {
    let mut out = Vec::new();
    for span in TIMESPANS {
        let doc = match fetcher.get_html_with_query(profile_url, &[("timespan", span)]) {
            Ok(doc) => doc,
            Err(err) => {
                warn!(timespan = span, error = %err, "agent stats fetch failed");
                continue;
            }
        };
        let mut agents = parse_agent_table(&doc);
        if agents.is_empty() {
            debug!(timespan = span, "no agent rows parsed");
            continue;
        }
        agents.push(overall_line(&agents));
        out.push(TimespanStats {
            timespan: span.to_string(),
            agents,
        });
    }
    out
}

/// Parse the first `table.wf-table` into agent rows. Rows with fewer than 17
/// cells or non-numeric stat text are skipped whole; empty cells count as
/// zero.
pub fn parse_agent_table(doc: &Html) -> Vec<AgentStatLine> {
    let table_sel = sel("table.wf-table");
    let row_sel = sel("tbody tr");
    let cell_sel = sel("td");
    let img_sel = sel("img");

    let Some(table) = doc.root_element().select(&table_sel).next() else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<_> = row.select(&cell_sel).collect();
        if cells.len() < 17 {
            continue;
        }
        let agent = cells[0]
            .select(&img_sel)
            .next()
            .and_then(|img| img.value().attr("alt"))
            .map(capitalize)
            .unwrap_or_else(|| "Unknown".to_string());

        let Some(line) = (|| {
            Some(AgentStatLine {
                agent,
                rounds: num(&text_of(&cells[2]))? as u32,
                rating: num(&text_of(&cells[3]))?,
                acs: num(&text_of(&cells[4]))?,
                kd: num(&text_of(&cells[5]))?,
                adr: num(&text_of(&cells[6]))?,
                kast: text_of(&cells[7]),
                kpr: num(&text_of(&cells[8]))?,
                apr: num(&text_of(&cells[9]))?,
                fkpr: num(&text_of(&cells[10]))?,
                fdpr: num(&text_of(&cells[11]))?,
                kills: num(&text_of(&cells[12]))? as u32,
                deaths: num(&text_of(&cells[13]))? as u32,
                assists: num(&text_of(&cells[14]))? as u32,
                first_kills: num(&text_of(&cells[15]))? as u32,
                first_deaths: num(&text_of(&cells[16]))? as u32,
            })
        })() else {
            continue;
        };
        lines.push(line);
    }
    lines
}

/// Aggregate row across all agents: counting stats summed, rate stats
/// averaged (unweighted, matching the site's own overview row), K/D
/// recomputed from the summed kills and deaths.
pub fn overall_line(lines: &[AgentStatLine]) -> AgentStatLine {
    let rounds = lines.iter().map(|l| l.rounds).sum();
    let kills: u32 = lines.iter().map(|l| l.kills).sum();
    let deaths: u32 = lines.iter().map(|l| l.deaths).sum();
    let kast_values: Vec<f64> = lines
        .iter()
        .filter_map(|l| l.kast.trim().trim_end_matches('%').parse().ok())
        .collect();
    let kast = if kast_values.is_empty() {
        "0%".to_string()
    } else {
        let mean = kast_values.iter().sum::<f64>() / kast_values.len() as f64;
        format!("{}%", mean.round())
    };

    AgentStatLine {
        agent: OVERALL_AGENT.to_string(),
        rounds,
        rating: mean_of(lines, |l| l.rating),
        acs: mean_of(lines, |l| l.acs),
        kd: if deaths > 0 {
            round2(f64::from(kills) / f64::from(deaths))
        } else {
            0.0
        },
        adr: mean_of(lines, |l| l.adr),
        kast,
        kpr: mean_of(lines, |l| l.kpr),
        apr: mean_of(lines, |l| l.apr),
        fkpr: mean_of(lines, |l| l.fkpr),
        fdpr: mean_of(lines, |l| l.fdpr),
        kills,
        deaths,
        assists: lines.iter().map(|l| l.assists).sum(),
        first_kills: lines.iter().map(|l| l.first_kills).sum(),
        first_deaths: lines.iter().map(|l| l.first_deaths).sum(),
    }
}

fn mean_of(lines: &[AgentStatLine], field: impl Fn(&AgentStatLine) -> f64) -> f64 {
    if lines.is_empty() {
        return 0.0;
    }
    round2(lines.iter().map(field).sum::<f64>() / lines.len() as f64)
}

/// Empty text parses as zero; anything non-numeric rejects the row.
fn num(text: &str) -> Option<f64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse().ok()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use scraper::Html;

    use super::{num, overall_line, parse_agent_table};

    fn agent_row(agent: &str, values: [&str; 15]) -> String {
        let mut cells = vec![
            format!(r#"<td><img alt="{agent}"></td>"#),
            "<td>25</td>".to_string(),
        ];
        cells.extend(values.iter().map(|v| format!("<td>{v}</td>")));
        format!("<tr>{}</tr>", cells.join(""))
    }

    fn table(rows: &[String]) -> String {
        format!(
            r#"<table class="wf-table"><tbody>{}</tbody></table>"#,
            rows.join("")
        )
    }

    #[test]
    fn parses_full_rows_and_capitalizes_agents() {
        let html = table(&[agent_row(
            "jett",
            [
                "412", "1.12", "245.3", "1.3", "156.2", "72%", "0.85", "0.3", "0.21", "0.15",
                "350", "270", "98", "86", "60",
            ],
        )]);
        let lines = parse_agent_table(&Html::parse_document(&html));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].agent, "Jett");
        assert_eq!(lines[0].rounds, 412);
        assert_eq!(lines[0].rating, 1.12);
        assert_eq!(lines[0].kast, "72%");
        assert_eq!(lines[0].kills, 350);
        assert_eq!(lines[0].first_deaths, 60);
    }

    #[test]
    fn short_and_garbage_rows_are_skipped() {
        let html = table(&[
            "<tr><td>too short</td></tr>".to_string(),
            agent_row(
                "raze",
                [
                    "100", "not-a-number", "200", "1.0", "150", "70%", "0.8", "0.3", "0.2", "0.1",
                    "80", "70", "30", "20", "15",
                ],
            ),
            agent_row(
                "omen",
                [
                    "100", "1.05", "200", "1.0", "150", "70%", "0.8", "0.3", "0.2", "0.1", "80",
                    "70", "30", "20", "15",
                ],
            ),
        ]);
        let lines = parse_agent_table(&Html::parse_document(&html));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].agent, "Omen");
    }

    #[test]
    fn empty_cells_count_as_zero() {
        assert_eq!(num(""), Some(0.0));
        assert_eq!(num("  "), Some(0.0));
        assert_eq!(num("1.5"), Some(1.5));
        assert_eq!(num("n/a"), None);
    }

    #[test]
    fn overall_sums_counts_and_averages_rates() {
        let html = table(&[
            agent_row(
                "jett",
                [
                    "100", "1.2", "240", "1.5", "160", "70%", "0.9", "0.2", "0.2", "0.1", "150",
                    "100", "40", "30", "20",
                ],
            ),
            agent_row(
                "raze",
                [
                    "100", "1.0", "200", "1.0", "140", "80%", "0.7", "0.4", "0.1", "0.2", "100",
                    "100", "60", "10", "30",
                ],
            ),
        ]);
        let lines = parse_agent_table(&Html::parse_document(&html));
        let overall = overall_line(&lines);

        assert_eq!(overall.agent, "Overall");
        assert_eq!(overall.rounds, 200);
        assert_eq!(overall.kills, 250);
        assert_eq!(overall.deaths, 200);
        // K/D recomputed from totals, not averaged.
        assert_eq!(overall.kd, 1.25);
        assert_eq!(overall.rating, 1.1);
        assert_eq!(overall.acs, 220.0);
        assert_eq!(overall.kast, "75%");
        assert_eq!(overall.first_kills, 40);
    }

    #[test]
    fn missing_table_yields_nothing() {
        let doc = Html::parse_document("<div>no stats</div>");
        assert!(parse_agent_table(&doc).is_empty());
    }
}
