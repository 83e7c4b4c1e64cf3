use std::fs;
use std::path::PathBuf;

use scraper::Html;

use vlr_pickem::history::{extract_match_links, match_date, match_title, parse_match_page};
use vlr_pickem::profile::select_search_hit;
use vlr_pickem::slate::parse_slate_json;
use vlr_pickem::team::{current_team, parse_match_roster};

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(&path).unwrap_or_else(|e| panic!("read fixture {name}: {e}"))
}

#[test]
fn flat_slate_keeps_only_the_kills_market() {
    let raw = read_fixture("underdog_flat.json");
    let entries = parse_slate_json(&raw).expect("parse flat slate");

    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].player, "TenZ");
    assert_eq!(entries[0].line, Some(31.5));
    assert_eq!(entries[0].over_price.as_deref(), Some("-122"));
    assert_eq!(entries[0].under_price.as_deref(), Some("-105"));
    assert_eq!(entries[1].player, "aspas");
    assert_eq!(entries[1].line, Some(35.5));
    // Flat schema carries no team or match metadata.
    assert_eq!(entries[0].team, None);
    assert_eq!(entries[0].match_label, None);
}

#[test]
fn composite_slate_joins_team_and_match_metadata() {
    let raw = read_fixture("underdog_composite.json");
    let entries = parse_slate_json(&raw).expect("parse composite slate");

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0].player, "TenZ");
    assert_eq!(entries[0].team.as_deref(), Some("SEN"));
    assert_eq!(entries[0].match_label.as_deref(), Some("SEN vs LEV"));
    // Numeric ids join the same as string ids.
    assert_eq!(entries[1].player, "aspas");
    assert_eq!(entries[1].team.as_deref(), Some("LEV"));
    // A broken join leaves metadata absent, never drops the line.
    assert_eq!(entries[2].player, "Boostio");
    assert_eq!(entries[2].team, None);
    assert_eq!(entries[2].match_label, None);
    assert_eq!(entries[2].over_price, None);
}

#[test]
fn search_selects_first_containing_result() {
    let doc = Html::parse_document(&read_fixture("search_results.html"));
    // Both titles contain "tenz" after normalization; the first containing
    // result wins, and here that is the lookalike listed first.
    let hit = select_search_hit(&doc, "TenZ").expect("hit");
    assert_eq!(hit.href, "/player/10109/ten-z-fake");

    let hit = select_search_hit(&doc, "ten z fake").expect("hit");
    assert_eq!(hit.href, "/player/10109/ten-z-fake");
}

#[test]
fn profile_page_yields_current_team_and_match_links() {
    let doc = Html::parse_document(&read_fixture("player_profile.html"));

    let team = current_team(&doc, "https://www.vlr.gg").expect("current team");
    assert_eq!(team.name, "Sentinels");
    assert_eq!(
        team.url.as_deref(),
        Some("https://www.vlr.gg/team/2/sentinels")
    );

    let links = extract_match_links(&doc, "https://www.vlr.gg");
    assert_eq!(
        links,
        vec![
            "https://www.vlr.gg/378822/sentinels-vs-leviatan",
            "https://www.vlr.gg/377100/sentinels-vs-g2",
        ]
    );
}

#[test]
fn match_page_header_and_per_map_rows() {
    let doc = Html::parse_document(&read_fixture("match_page.html"));

    assert_eq!(match_title(&doc), "Sentinels vs Leviatan");
    assert_eq!(match_date(&doc), "2025-06-07");

    let records = parse_match_page(&doc, "378822", "TenZ");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].map_name, "Ascent");
    assert_eq!(records[0].agent, "jett");
    assert_eq!(records[0].kills, 21);
    assert_eq!(records[1].map_name, "Bind");
    assert_eq!(records[1].kills, 17);

    // Full display names in the title attribute still match the short name.
    let aspas = parse_match_page(&doc, "378822", "aspas");
    assert_eq!(aspas.len(), 2);
    assert_eq!(aspas[0].kills, 24);
}

#[test]
fn roster_covers_both_teams() {
    let doc = Html::parse_document(&read_fixture("match_page.html"));
    let roster = parse_match_roster(&doc, "https://www.vlr.gg");

    assert_eq!(roster.teams, vec!["Sentinels", "Leviatan"]);
    let tenz = roster.players.get("sentenz").expect("tenz by title attr");
    assert_eq!(tenz.url, "https://www.vlr.gg/player/9/tenz");
    assert_eq!(tenz.team.as_deref(), Some("Sentinels"));
    let aspas = roster.players.get("levaspas").expect("aspas");
    assert_eq!(aspas.team.as_deref(), Some("Leviatan"));
    let zekken = roster.players.get("zekken").expect("zekken");
    assert_eq!(zekken.team.as_deref(), Some("Sentinels"));
}
