use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use rust_xlsxwriter::{Color, Format, Workbook, Worksheet};

use crate::agents::TimespanStats;
use crate::merge::{PlayerReport, SlateAnalysis};
use crate::names;

// Fill colors matching the usual over/under/push spreadsheet convention.
const OVER_FILL: Color = Color::RGB(0x00C6_EFCE);
const UNDER_FILL: Color = Color::RGB(0x00FF_C7CE);
const PUSH_FILL: Color = Color::RGB(0x00FF_EB9C);

/// Write the slate analysis to a timestamped workbook under `dir`, one row
/// per betting line grouped by match. Average cells are color coded against
/// the line: green above, red below, yellow on an exact push.
pub fn export_slate(analysis: &SlateAnalysis, dir: &Path) -> Result<PathBuf> {
    let path = timestamped_path(dir, "slate")?;
    let mut workbook = Workbook::new();
    let sheet = workbook.add_worksheet();
    sheet.set_name("Slate")?;

    let header = [
        "Match", "Player", "Team", "Line", "Odds Over", "Odds Under", "Avg L5", "Avg L10",
        "Avg L25", "Matches", "Error",
    ];
    for (col, title) in header.iter().enumerate() {
        sheet.write_string(0, col as u16, *title)?;
    }

    let over = Format::new().set_background_color(OVER_FILL);
    let under = Format::new().set_background_color(UNDER_FILL);
    let push = Format::new().set_background_color(PUSH_FILL);

    let mut row_idx: u32 = 1;
    for group in &analysis.groups {
        for row in &group.players {
            sheet.write_string(row_idx, 0, &group.key)?;
            sheet.write_string(row_idx, 1, &row.player)?;
            sheet.write_string(row_idx, 2, row.team.as_deref().unwrap_or_default())?;
            if let Some(line) = row.line {
                sheet.write_number(row_idx, 3, line)?;
            }
            sheet.write_string(row_idx, 4, row.odds_over.as_deref().unwrap_or_default())?;
            sheet.write_string(row_idx, 5, row.odds_under.as_deref().unwrap_or_default())?;
            for (col, avg) in [(6, row.avg_last_5), (7, row.avg_last_10), (8, row.avg_last_25)] {
                let Some(avg) = avg else { continue };
                match fill_for(avg, row.line) {
                    Some(fill) => {
                        let format = match fill {
                            Fill::Over => &over,
                            Fill::Under => &under,
                            Fill::Push => &push,
                        };
                        sheet.write_number_with_format(row_idx, col, avg, format)?;
                    }
                    None => sheet.write_number(row_idx, col, avg).map(|_| ())?,
                }
            }
            if let Some(n) = row.matches_analyzed {
                sheet.write_number(row_idx, 9, n as f64)?;
            }
            if let Some(error) = &row.error {
                sheet.write_string(row_idx, 10, error.to_string())?;
            }
            row_idx += 1;
        }
    }

    workbook
        .save(&path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(path)
}

/// Write one player's eligible match history to a workbook: a per-match
/// summary sheet followed by the raw per-map kill detail.
pub fn export_player(report: &PlayerReport, dir: &Path) -> Result<PathBuf> {
    let path = timestamped_path(dir, &player_slug(&report.player))?;

    let mut summary_rows = vec![vec![
        "Match ID".to_string(),
        "Match".to_string(),
        "Date".to_string(),
        "Map 1 Kills".to_string(),
        "Map 2 Kills".to_string(),
        "Total".to_string(),
    ]];
    let mut detail_rows = vec![vec![
        "Match ID".to_string(),
        "Match".to_string(),
        "Date".to_string(),
        "Map".to_string(),
        "Agent".to_string(),
        "Kills".to_string(),
    ]];

    for summary in &report.matches {
        let mut row = vec![
            summary.match_id.clone(),
            summary.match_title.clone(),
            summary.date.clone(),
        ];
        for map in &summary.map_kills {
            row.push(map.kills.to_string());
        }
        while row.len() < 5 {
            row.push(String::new());
        }
        row.push(summary.total_kills.to_string());
        summary_rows.push(row);

        for map in &summary.map_kills {
            detail_rows.push(vec![
                summary.match_id.clone(),
                summary.match_title.clone(),
                summary.date.clone(),
                map.map.clone(),
                map.agent.clone(),
                map.kills.to_string(),
            ]);
        }
    }

    summary_rows.push(Vec::new());
    for (label, value) in [
        ("Avg Last 5", report.averages.last_5),
        ("Avg Last 10", report.averages.last_10),
        ("Avg Last 25", report.averages.last_25),
    ] {
        summary_rows.push(vec![
            label.to_string(),
            value.map(|v| v.to_string()).unwrap_or_default(),
        ]);
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Match Summary")?;
        write_rows(sheet, &summary_rows)?;
    }
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Map Kills Detail")?;
        write_rows(sheet, &detail_rows)?;
    }

    workbook
        .save(&path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(path)
}

/// Write a player's per-agent stats, one row per timespan/agent pair, to its
/// own workbook.
pub fn export_agent_stats(player: &str, stats: &[TimespanStats], dir: &Path) -> Result<PathBuf> {
    let path = timestamped_path(dir, &format!("{}_agent_stats", player_slug(player)))?;

    let mut rows = vec![vec![
        "Timespan".to_string(),
        "Agent".to_string(),
        "Rounds".to_string(),
        "Rating".to_string(),
        "ACS".to_string(),
        "K/D".to_string(),
        "ADR".to_string(),
        "KAST".to_string(),
        "KPR".to_string(),
        "APR".to_string(),
        "FKPR".to_string(),
        "FDPR".to_string(),
        "Kills".to_string(),
        "Deaths".to_string(),
        "Assists".to_string(),
        "FK".to_string(),
        "FD".to_string(),
    ]];
    for span in stats {
        for agent in &span.agents {
            rows.push(vec![
                span.timespan.clone(),
                agent.agent.clone(),
                agent.rounds.to_string(),
                agent.rating.to_string(),
                agent.acs.to_string(),
                agent.kd.to_string(),
                agent.adr.to_string(),
                agent.kast.clone(),
                agent.kpr.to_string(),
                agent.apr.to_string(),
                agent.fkpr.to_string(),
                agent.fdpr.to_string(),
                agent.kills.to_string(),
                agent.deaths.to_string(),
                agent.assists.to_string(),
                agent.first_kills.to_string(),
                agent.first_deaths.to_string(),
            ]);
        }
    }

    let mut workbook = Workbook::new();
    {
        let sheet = workbook.add_worksheet();
        sheet.set_name("Agent Stats")?;
        write_rows(sheet, &rows)?;
    }
    workbook
        .save(&path)
        .with_context(|| format!("failed writing workbook to {}", path.display()))?;
    Ok(path)
}

fn player_slug(player: &str) -> String {
    let normalized = names::normalize(player);
    if normalized.is_empty() {
        "player".to_string()
    } else {
        normalized
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Fill {
    Over,
    Under,
    Push,
}

fn fill_for(average: f64, line: Option<f64>) -> Option<Fill> {
    let line = line?;
    if average > line {
        Some(Fill::Over)
    } else if average < line {
        Some(Fill::Under)
    } else {
        Some(Fill::Push)
    }
}

fn timestamped_path(dir: &Path, stem: &str) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("failed creating export dir {}", dir.display()))?;
    let stamp = Utc::now().format("%Y%m%d_%H%M%S");
    Ok(dir.join(format!("{stem}_{stamp}.xlsx")))
}

fn write_rows(worksheet: &mut Worksheet, rows: &[Vec<String>]) -> Result<()> {
    for (row_idx, row) in rows.iter().enumerate() {
        for (col_idx, value) in row.iter().enumerate() {
            worksheet
                .write_string(row_idx as u32, col_idx as u16, value)
                .with_context(|| format!("write cell ({row_idx},{col_idx})"))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{fill_for, Fill};

    #[test]
    fn fill_tracks_average_against_line() {
        assert_eq!(fill_for(15.2, Some(14.5)), Some(Fill::Over));
        assert_eq!(fill_for(13.9, Some(14.5)), Some(Fill::Under));
        assert_eq!(fill_for(14.5, Some(14.5)), Some(Fill::Push));
        assert_eq!(fill_for(14.5, None), None);
    }
}
