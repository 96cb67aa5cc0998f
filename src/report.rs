// 📄 Report Rendering - earnings, chain and war pages, CSV breakdown, number formatting
// Pages are plain string templates with {{KEY}} placeholders.

use crate::chain::{rank_by_respect, ChainSummary};
use crate::earnings::{EarningsReport, EarningsRow, PayoutParams, PoolSummary};
use crate::names::NameReconciler;
use crate::parser::{ChainReport, ChainStat};
use crate::war::{FactionSide, MemberWarStats, WarReport};
use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Write;
use std::path::Path;
use tracing::{info, warn};

/// Profile link base for members with a known numeric ID
pub const PROFILE_URL: &str = "https://www.torn.com/profiles.php?XID=";

/// Placeholder the earnings table is injected into
pub const TABLE_PLACEHOLDER: &str = "EARNINGS_TABLE";

pub const DEFAULT_EARNINGS_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>War Earnings</title>
<style>
body { font-family: sans-serif; background: #111827; color: #e5e7eb; }
table.earnings_report { border-collapse: collapse; width: 100%; }
table.earnings_report th, table.earnings_report td { padding: 4px 8px; border-bottom: 1px solid #374151; text-align: right; }
table.earnings_report td:first-child, table.earnings_report th:first-child { text-align: left; }
a { color: #67e8f9; text-decoration: none; }
</style>
</head>
<body>
<h1>War Earnings</h1>
<h2>Pool</h2>
<p>Total caches: {{TOTAL_CACHES}} | Tax: {{TAX_AMOUNT}} | Payout: {{TOTAL_PAYOUT}}</p>
<p>Respect pool ({{RESPECT_WEIGHT}}): {{RESPECT_POOL}} | Hit pool ({{HIT_WEIGHT}}): {{HIT_POOL}}</p>
<h2>Totals</h2>
<p>Hits: {{TOTAL_HITS}} | Score: {{TOTAL_SCORE}} | Avg score/hit: {{AVG_SCORE_HIT}}</p>
<p>Saves: {{TOTAL_SAVES}} | Save score: {{TOTAL_SAVE_SCORE}} | Save resp: {{SAVE_RESP}} | Save pay: {{SAVE_PAY}}</p>
<p>Mod score: {{MOD_SCORE}} | Mod hits: {{MOD_HIT}} | Pay per score: {{PAY_SCORE}} | Pay per hit: {{PAY_HIT}}</p>
<p>Members: {{TOTAL_MEMBERS}}</p>
{{EARNINGS_TABLE}}
</body>
</html>
"#;

// ============================================================================
// NUMBER FORMATTING
// ============================================================================

/// 1234.5 -> "$1,234.50"
pub fn format_us_currency(amount: f64) -> String {
    if amount < 0.0 {
        format!("-${}", format_us_number(-amount))
    } else {
        format!("${}", format_us_number(amount))
    }
}

/// 1234.5 -> "1,234.50"
pub fn format_us_number(amount: f64) -> String {
    format_grouped(amount, 2, ',', '.')
}

/// 1234.6 -> "1,235"
pub fn format_us_whole(value: f64) -> String {
    format_grouped(value, 0, ',', '.')
}

/// 1234 -> "1,234"
pub fn format_us_count(count: u64) -> String {
    group_digits(&count.to_string(), ',')
}

/// 1234.5 with 2 decimals -> "1.234,50"
pub fn format_european_number(value: f64, decimals: usize) -> String {
    format_grouped(value, decimals, '.', ',')
}

fn format_grouped(value: f64, decimals: usize, thousands: char, decimal: char) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let fixed = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut out = String::new();
    // "-0.00" reads badly; only mark a sign when something non-zero survives rounding
    if value < 0.0 && fixed.chars().any(|c| c.is_ascii_digit() && c != '0') {
        out.push('-');
    }
    out.push_str(&group_digits(int_part, thousands));
    if let Some(frac) = frac_part {
        out.push(decimal);
        out.push_str(frac);
    }
    out
}

fn group_digits(digits: &str, separator: char) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(separator);
        }
        out.push(c);
    }
    out
}

/// Weights print without a trailing ".0" when whole
fn format_weight(weight: f64) -> String {
    if weight.fract() == 0.0 {
        format!("{:.0}", weight)
    } else {
        weight.to_string()
    }
}

fn percent_cell(value: f64) -> String {
    format!("{:.2}%", value)
}

pub fn html_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

// ============================================================================
// HTML
// ============================================================================

const TABLE_HEADERS: [&str; 12] = [
    "Member",
    "Respect",
    "War Hits",
    "Total Score",
    "Saves",
    "Save Score",
    "Respect %",
    "Hit %",
    "Respect Earnings",
    "Hit Earnings",
    "Total Earnings",
    "Total %",
];

fn profile_link(id: &str, name: &str) -> String {
    format!(
        r#"<a href="{}{}" target="_blank">{}</a>"#,
        PROFILE_URL,
        html_escape(id),
        html_escape(name)
    )
}

fn member_cell(row: &EarningsRow) -> String {
    match &row.member_id {
        Some(id) => profile_link(id, &row.canonical_name),
        None => html_escape(&row.member),
    }
}

fn push_row(html: &mut String, cells: &[String], tag: &str) {
    html.push_str("<tr>");
    for cell in cells {
        html.push('<');
        html.push_str(tag);
        html.push('>');
        html.push_str(cell);
        html.push_str("</");
        html.push_str(tag);
        html.push('>');
    }
    html.push_str("</tr>\n");
}

/// Earnings table, highest earner first
pub fn render_earnings_table(report: &EarningsReport) -> String {
    let mut html = String::from("<table class=\"earnings_report\">\n<thead>\n<tr>");
    for header in TABLE_HEADERS {
        html.push_str("<th>");
        html.push_str(header);
        html.push_str("</th>");
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in report.sorted_by_earnings() {
        let cells = [
            member_cell(row),
            format!("{:.2}", row.war_respect),
            row.war_hits.to_string(),
            format!("{:.2}", row.total_score),
            row.saves.to_string(),
            format!("{:.2}", row.save_score),
            percent_cell(row.score_share),
            percent_cell(row.hit_share),
            format_us_currency(row.score_earnings),
            format_us_currency(row.hit_earnings),
            format_us_currency(row.earnings),
            percent_cell(row.total_share),
        ];

        push_row(&mut html, &cells, "td");
    }

    html.push_str("</tbody>\n</table>");
    html
}

/// Replace every `{{KEY}}` with its value. Unknown placeholders stay as-is.
pub fn apply_template(template: &str, values: &[(&str, String)]) -> String {
    let mut html = template.to_string();
    for (key, value) in values {
        html = html.replace(&format!("{{{{{}}}}}", key), value);
    }
    html
}

/// Header figures in display form, keyed by placeholder name
pub fn summary_placeholders(summary: &PoolSummary, params: &PayoutParams) -> Vec<(&'static str, String)> {
    let save_pay = summary.total_saves as f64 * summary.pay_rate_per_hit;

    vec![
        ("TOTAL_HITS", format_us_count(summary.mod_hits)),
        ("TOTAL_SCORE", format_us_number(summary.mod_score)),
        ("AVG_SCORE_HIT", format!("{:.2}", summary.avg_score_per_hit)),
        ("TOTAL_CACHES", format_us_currency(summary.total_pool)),
        ("TAX_AMOUNT", format_us_currency(summary.tax_amount)),
        ("TOTAL_PAYOUT", format_us_currency(summary.payout_pool)),
        ("TOTAL_SAVES", summary.total_saves.to_string()),
        ("SAVE_RESP", format!("{:.2}", summary.save_resp)),
        ("TOTAL_SAVE_SCORE", format!("{:.2}", summary.total_save_score)),
        ("SAVE_PAY", format_us_currency(save_pay)),
        ("MOD_SCORE", format_us_number(summary.mod_score)),
        ("MOD_HIT", format_us_count(summary.mod_hits)),
        ("PAY_HIT", format_us_currency(summary.pay_rate_per_hit)),
        ("PAY_SCORE", format_us_currency(summary.pay_rate_per_score)),
        ("RESPECT_POOL", format_us_currency(summary.score_pool)),
        ("HIT_POOL", format_us_currency(summary.hit_pool)),
        ("RESPECT_WEIGHT", format_weight(params.score_weight)),
        ("HIT_WEIGHT", format_weight(params.hit_weight)),
        ("TOTAL_MEMBERS", summary.member_count.to_string()),
    ]
}

/// Full page; `template` falls back to DEFAULT_EARNINGS_TEMPLATE
pub fn render_earnings_html(report: &EarningsReport, template: Option<&str>) -> String {
    let template = template.unwrap_or(DEFAULT_EARNINGS_TEMPLATE);

    if !template.contains(&format!("{{{{{}}}}}", TABLE_PLACEHOLDER)) {
        warn!(stage = "report", placeholder = TABLE_PLACEHOLDER, "template has no table placeholder");
    }

    let mut values = summary_placeholders(&report.summary, &report.params);
    values.push((TABLE_PLACEHOLDER, render_earnings_table(report)));

    apply_template(template, &values)
}

pub fn load_template(path: &Path) -> Result<String> {
    fs::read_to_string(path)
        .with_context(|| format!("Failed to read template: {}", path.display()))
}

/// Write a rendered page
pub fn write_html(path: &Path, html: &str) -> Result<()> {
    fs::write(path, html).with_context(|| format!("Failed to write {}", path.display()))?;

    info!(stage = "report", file = %path.display(), bytes = html.len(), "HTML report written");
    Ok(())
}

pub fn write_earnings_html(path: &Path, report: &EarningsReport, template: Option<&str>) -> Result<()> {
    write_html(path, &render_earnings_html(report, template))
}

// ============================================================================
// CHAIN PAGE
// ============================================================================

pub const CHAIN_TABLE_PLACEHOLDER: &str = "CHAIN_TABLE";

pub const DEFAULT_CHAIN_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>Chain Report {{CHAIN_ID}}</title>
<style>
body { font-family: sans-serif; background: #111827; color: #e5e7eb; }
table.war_report { border-collapse: collapse; width: 100%; }
table.war_report th, table.war_report td { padding: 4px 8px; border-bottom: 1px solid #374151; text-align: right; }
table.war_report td:first-child, table.war_report th:first-child { text-align: left; }
tr.totals-row th { background: #1f2937; }
div.pct { font-size: 10px; color: #aaa; }
a { color: #67e8f9; text-decoration: none; }
</style>
</head>
<body>
<h1>{{FACTION_NAME}} - Chain {{CHAIN_ID}}</h1>
<p>Members: {{TOTAL_MEMBERS}} | Respect: {{TOTAL_RESPECT}} | Attacks: {{TOTAL_ATTACKS}} | Avg respect: {{AVG_RESPECT}}</p>
<p>Leave rate: {{LEAVE_RATE}}% | Hosp rate: {{HOSP_RATE}}%</p>
{{CHAIN_TABLE}}
</body>
</html>
"#;

const CHAIN_HEADERS: [&str; 16] = [
    "Member", "Respect", "Best", "Avg", "Attacks", "War", "Outside", "Leave", "Hosp", "Mug",
    "Retal", "Overseas", "Draw", "Assist", "Escape", "Loss",
];

fn ratio_percent(part: f64, whole: f64) -> f64 {
    if whole > 0.0 {
        part / whole * 100.0
    } else {
        0.0
    }
}

/// A count with its share underneath; `data-sort` keeps the raw count for sortable tables
pub fn value_with_percent(value: u64, total: u64) -> String {
    format!(
        r#"<div data-sort="{}">{}<div class="pct">{:.2}%</div></div>"#,
        value,
        format_us_count(value),
        ratio_percent(value as f64, total as f64)
    )
}

fn strong(text: &str) -> String {
    format!("<strong>{}</strong>", text)
}

/// War and outside hits are shares of all attacks, outcome columns shares of war hits
fn chain_cells(
    member: String,
    respect: f64,
    best: f64,
    avg: f64,
    counts: &ChainCounts,
    emphasize: bool,
) -> Vec<String> {
    let wrap = |text: String| if emphasize { strong(&text) } else { text };
    let of_attacks = |value: u64| wrap(value_with_percent(value, counts.attacks));
    let of_war = |value: u64| wrap(value_with_percent(value, counts.war));

    vec![
        member,
        wrap(format_us_whole(respect)),
        wrap(format_us_number(best)),
        wrap(format_us_number(avg)),
        wrap(format_us_count(counts.attacks)),
        of_attacks(counts.war),
        of_attacks(counts.outside),
        of_war(counts.leave),
        of_war(counts.hosp),
        of_war(counts.mug),
        of_war(counts.retal),
        of_war(counts.overseas),
        of_war(counts.draw),
        of_war(counts.assist),
        of_war(counts.escape),
        of_war(counts.loss),
    ]
}

#[derive(Default)]
struct ChainCounts {
    attacks: u64,
    war: u64,
    outside: u64,
    leave: u64,
    hosp: u64,
    mug: u64,
    retal: u64,
    overseas: u64,
    draw: u64,
    assist: u64,
    escape: u64,
    loss: u64,
}

impl ChainCounts {
    fn of(row: &ChainStat) -> Self {
        ChainCounts {
            attacks: row.attacks as u64,
            war: row.war as u64,
            outside: row.outside() as u64,
            leave: row.leave as u64,
            hosp: row.hosp as u64,
            mug: row.mug as u64,
            retal: row.retal as u64,
            overseas: row.overseas as u64,
            draw: row.draw as u64,
            assist: row.assist as u64,
            escape: row.escape as u64,
            loss: row.loss as u64,
        }
    }

    fn add(&mut self, other: &ChainCounts) {
        self.attacks += other.attacks;
        self.war += other.war;
        self.outside += other.outside;
        self.leave += other.leave;
        self.hosp += other.hosp;
        self.mug += other.mug;
        self.retal += other.retal;
        self.overseas += other.overseas;
        self.draw += other.draw;
        self.assist += other.assist;
        self.escape += other.escape;
        self.loss += other.loss;
    }
}

fn chain_member_cell(raw: &str, reconciler: &NameReconciler) -> String {
    let record = reconciler.reconcile(raw);
    match &record.numeric_id {
        Some(id) => profile_link(id, &record.canonical_name),
        None => html_escape(raw),
    }
}

/// Chain breakdown, highest respect first, with a totals row under the header
pub fn render_chain_table(report: &ChainReport, reconciler: &NameReconciler) -> String {
    let summary = ChainSummary::from_report(report);
    let mut totals = ChainCounts::default();
    for row in &report.rows {
        totals.add(&ChainCounts::of(row));
    }

    let mut html = String::from("<table class=\"war_report\">\n<thead>\n");
    let headers: Vec<String> = CHAIN_HEADERS.iter().map(|h| h.to_string()).collect();
    push_row(&mut html, &headers, "th");

    html.push_str("<tr class=\"totals-row\">");
    for cell in chain_cells(
        strong("TOTALS"),
        summary.total_respect,
        summary.best_hit,
        summary.avg_respect,
        &totals,
        true,
    ) {
        html.push_str("<th class=\"totals-cell\">");
        html.push_str(&cell);
        html.push_str("</th>");
    }
    html.push_str("</tr>\n</thead>\n<tbody>\n");

    for row in rank_by_respect(&report.rows) {
        let cells = chain_cells(
            chain_member_cell(&row.member, reconciler),
            row.respect,
            row.best,
            row.avg,
            &ChainCounts::of(row),
            false,
        );
        push_row(&mut html, &cells, "td");
    }

    html.push_str("</tbody>\n</table>");
    html
}

/// Header figures of the chain page (European number style, like the game's export)
pub fn chain_placeholders(report: &ChainReport, summary: &ChainSummary) -> Vec<(&'static str, String)> {
    vec![
        ("FACTION_NAME", html_escape(&report.faction_name)),
        ("CHAIN_ID", html_escape(report.chain_id.as_deref().unwrap_or("-"))),
        ("TOTAL_MEMBERS", summary.total_members.to_string()),
        ("TOTAL_RESPECT", format_european_number(summary.total_respect, 0)),
        ("TOTAL_ATTACKS", format_european_number(summary.total_attacks as f64, 0)),
        ("AVG_RESPECT", format_european_number(summary.avg_respect, 2)),
        ("LEAVE_RATE", format_european_number(summary.leave_rate, 1)),
        ("HOSP_RATE", format_european_number(summary.hosp_rate, 1)),
    ]
}

pub fn render_chain_html(report: &ChainReport, reconciler: &NameReconciler, template: Option<&str>) -> String {
    let template = template.unwrap_or(DEFAULT_CHAIN_TEMPLATE);
    let summary = ChainSummary::from_report(report);

    let mut values = chain_placeholders(report, &summary);
    values.push((CHAIN_TABLE_PLACEHOLDER, render_chain_table(report, reconciler)));

    apply_template(template, &values)
}

// ============================================================================
// WAR PAGE
// ============================================================================

pub const WAR_TABLE_PLACEHOLDER: &str = "TABLE_HTML";

pub const DEFAULT_WAR_TEMPLATE: &str = r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>War Report {{WAR_ID}}</title>
<style>
body { font-family: sans-serif; background: #111827; color: #e5e7eb; }
div.tables-container { display: flex; gap: 20px; }
div.faction-section { flex: 1; }
div.faction-stats { display: flex; gap: 10px; margin-bottom: 15px; }
div.stat-box { background: #1f2937; padding: 8px; border-radius: 6px; }
div.stat-label { font-size: 11px; color: #aaa; }
table.war_report { border-collapse: collapse; width: 100%; }
table.war_report th, table.war_report td { padding: 4px 8px; border-bottom: 1px solid #374151; text-align: right; }
table.war_report td:first-child, table.war_report th:first-child { text-align: left; }
a { color: #ffffff; text-decoration: none; }
</style>
</head>
<body>
<h1>War Report {{WAR_ID}}</h1>
<p>Period: {{WAR_START}} - {{WAR_END}} ({{WAR_DURATION}})</p>
<p>{{OUR_FACTION_NAME}} {{OUR_SCORE}} ({{OUR_ATTACKS}} attacks) vs {{ENEMY_FACTION_NAME}} {{ENEMY_SCORE}} ({{ENEMY_ATTACKS}} attacks)</p>
{{TABLE_HTML}}
</body>
</html>
"#;

const WAR_HEADERS: [&str; 11] = [
    "Members", "Level", "Attacks", "Hit %", "Score", "Score %", "Avg score/hit", "Efficiency",
    "Att/Hr", "Score/Lvl", "vs Avg",
];

fn war_member_cells(m: &MemberWarStats) -> Vec<String> {
    vec![
        profile_link(&m.member_id, &m.name),
        m.level.to_string(),
        m.attacks.to_string(),
        percent_cell(m.hit_share),
        format_us_number(m.score),
        percent_cell(m.score_share),
        format_us_number(m.avg_score_per_hit),
        format_us_number(m.score_per_minute),
        format_us_number(m.attacks_per_hour),
        format_us_number(m.score_per_level),
        format!("{:+.1}%", m.vs_faction_avg),
    ]
}

fn stat_box(value: &str, label: &str) -> String {
    format!(
        "<div class=\"stat-box\"><div class=\"stat-number\">{}</div><div class=\"stat-label\">{}</div></div>",
        value, label
    )
}

/// One faction: header, stat boxes, then members who attacked, highest score first
pub fn render_faction_section(side: &FactionSide, table_id: &str) -> String {
    let stats = &side.stats;
    let avg_hit_score = if stats.total_attacks > 0 {
        stats.total_score / stats.total_attacks as f64
    } else {
        0.0
    };

    let mut html = String::from("<div class=\"faction-section\">\n");
    html.push_str(&format!("<h3>{}</h3>\n<div class=\"faction-stats\">", html_escape(&stats.name)));
    for (value, label) in [
        (format_us_count(stats.total_attacks), "Attacks"),
        (format_us_number(stats.total_score), "Score"),
        (format!("{:.2}", stats.hits_per_minute), "Hits/Min"),
        (format!("{:.2}", avg_hit_score), "Avg Hit Score"),
        (format!("{:.1}%", stats.participation_rate), "Participation"),
        (format!("{:.1}%", stats.consistency_rating), "Consistency"),
    ] {
        html.push_str(&stat_box(&value, label));
    }
    html.push_str("</div>\n");

    html.push_str(&format!("<table class=\"war_report\" id=\"{}\">\n<thead>\n", table_id));
    let headers: Vec<String> = WAR_HEADERS.iter().map(|h| h.to_string()).collect();
    push_row(&mut html, &headers, "th");
    html.push_str("</thead>\n<tbody>\n");
    for member in side.participants() {
        push_row(&mut html, &war_member_cells(member), "td");
    }
    html.push_str("</tbody>\n</table>\n</div>\n");
    html
}

/// Our faction and the enemy side by side
pub fn render_war_tables(war: &WarReport) -> String {
    let mut html = String::from("<div class=\"tables-container\">\n");
    html.push_str(&render_faction_section(&war.ours, "our_faction_table"));
    if let Some(enemy) = &war.enemy {
        html.push_str(&render_faction_section(enemy, "enemy_faction_table"));
    }
    html.push_str("</div>");
    html
}

pub fn war_placeholders(war: &WarReport) -> Vec<(&'static str, String)> {
    let (enemy_name, enemy_attacks, enemy_score) = match &war.enemy {
        Some(e) => (e.stats.name.as_str(), e.stats.total_attacks, e.stats.total_score),
        None => ("Enemy Faction", 0, 0.0),
    };

    vec![
        ("WAR_ID", war.war_id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string())),
        ("WAR_START", war.start_tct()),
        ("WAR_END", war.end_tct()),
        ("WAR_DURATION", war.duration_hms()),
        ("OUR_FACTION_NAME", html_escape(&war.ours.stats.name)),
        ("OUR_ATTACKS", format_us_count(war.ours.stats.total_attacks)),
        ("OUR_SCORE", format_us_whole(war.ours.stats.total_score)),
        ("ENEMY_FACTION_NAME", html_escape(enemy_name)),
        ("ENEMY_ATTACKS", format_us_count(enemy_attacks)),
        ("ENEMY_SCORE", format_us_whole(enemy_score)),
    ]
}

pub fn render_war_html(war: &WarReport, template: Option<&str>) -> String {
    let template = template.unwrap_or(DEFAULT_WAR_TEMPLATE);

    let mut values = war_placeholders(war);
    values.push((WAR_TABLE_PLACEHOLDER, render_war_tables(war)));

    apply_template(template, &values)
}

// ============================================================================
// CSV
// ============================================================================

#[derive(Serialize)]
struct CsvRow<'a> {
    #[serde(rename = "Member")]
    member: &'a str,
    #[serde(rename = "Member_ID")]
    member_id: Option<&'a str>,
    #[serde(rename = "War_Respect")]
    war_respect: f64,
    #[serde(rename = "War_Hits")]
    war_hits: u32,
    #[serde(rename = "Saves")]
    saves: u32,
    #[serde(rename = "Save_Score")]
    save_score: f64,
    #[serde(rename = "Total_Score")]
    total_score: f64,
    #[serde(rename = "Respect_Share")]
    score_share: f64,
    #[serde(rename = "Hit_Share")]
    hit_share: f64,
    #[serde(rename = "Respect_Earnings")]
    score_earnings: f64,
    #[serde(rename = "Hit_Earnings")]
    hit_earnings: f64,
    #[serde(rename = "Total_Earnings")]
    earnings: f64,
    #[serde(rename = "Total_Share")]
    total_share: f64,
}

impl<'a> From<&'a EarningsRow> for CsvRow<'a> {
    fn from(row: &'a EarningsRow) -> Self {
        CsvRow {
            member: &row.member,
            member_id: row.member_id.as_deref(),
            war_respect: row.war_respect,
            war_hits: row.war_hits,
            saves: row.saves,
            save_score: row.save_score,
            total_score: row.total_score,
            score_share: row.score_share,
            hit_share: row.hit_share,
            score_earnings: row.score_earnings,
            hit_earnings: row.hit_earnings,
            earnings: row.earnings,
            total_share: row.total_share,
        }
    }
}

/// Breakdown CSV (comma-delimited, raw numbers), highest earner first
pub fn write_earnings_csv_to<W: Write>(writer: W, report: &EarningsReport) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for row in report.sorted_by_earnings() {
        wtr.serialize(CsvRow::from(row))
            .with_context(|| format!("Failed to write CSV row for {}", row.member))?;
    }
    wtr.flush().context("Failed to flush CSV")?;
    Ok(())
}

pub fn write_earnings_csv(path: &Path, report: &EarningsReport) -> Result<()> {
    let file = fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_earnings_csv_to(file, report)?;

    info!(stage = "report", file = %path.display(), rows = report.rows.len(), "CSV breakdown written");
    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================
