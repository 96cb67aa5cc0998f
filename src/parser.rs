// 🏗️ Source Parsers - chain report, war scores, saves
// One parser per export format, all behind the SourceParser trait.
// Rows keep the raw display name; reconciliation happens later (names.rs).

use anyhow::{Context, Result};
use calamine::Reader;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::war::WarReportParser;

// ============================================================================
// CORE TYPES
// ============================================================================

/// SourceType - which export a file came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    ChainReport,
    WarScores,
    WarReportJson,
    Saves,
}

impl SourceType {
    /// Human-readable name for display
    pub fn name(&self) -> &str {
        match self {
            SourceType::ChainReport => "Chain Report",
            SourceType::WarScores => "War Scores",
            SourceType::WarReportJson => "Ranked War Report",
            SourceType::Saves => "Saves",
        }
    }

    /// Short code used as the `source` field in log records
    pub fn code(&self) -> &'static str {
        match self {
            SourceType::ChainReport => "chain",
            SourceType::WarScores => "war",
            SourceType::WarReportJson => "war_json",
            SourceType::Saves => "saves",
        }
    }
}

/// One chain-report row. Counts are attacks of each outcome type.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChainStat {
    pub member: String,
    pub respect: f64,
    pub best: f64,
    pub avg: f64,
    pub attacks: u32,
    pub leave: u32,
    pub mug: u32,
    pub hosp: u32,
    pub war: u32,
    pub assist: u32,
    pub retal: u32,
    pub overseas: u32,
    pub draw: u32,
    pub escape: u32,
    pub loss: u32,
}

impl ChainStat {
    pub fn new(member: &str, respect: f64, attacks: u32, war: u32) -> Self {
        ChainStat {
            member: member.to_string(),
            respect,
            attacks,
            war,
            ..Default::default()
        }
    }

    /// Attacks made outside the war (chain-only hits)
    pub fn outside(&self) -> u32 {
        self.attacks.saturating_sub(self.war)
    }

    /// Percentage of this member's attacks that `count` represents
    pub fn share_of_attacks(&self, count: u32) -> f64 {
        if self.attacks == 0 {
            0.0
        } else {
            count as f64 / self.attacks as f64 * 100.0
        }
    }
}

/// A parsed chain report: header line + member rows
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainReport {
    pub faction_name: String,
    pub chain_id: Option<String>,
    pub rows: Vec<ChainStat>,
}

/// One war-score row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarStat {
    pub member: String,
    pub score: f64,

    // Only present when the row came from a ranked-war report
    pub attacks: Option<u32>,
    pub level: Option<u32>,
}

impl WarStat {
    pub fn new(member: &str, score: f64) -> Self {
        WarStat {
            member: member.to_string(),
            score,
            attacks: None,
            level: None,
        }
    }
}

/// One saves row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaveStat {
    pub member: String,
    pub saves: u32,
    pub save_score: f64,
}

impl SaveStat {
    pub fn new(member: &str, saves: u32, save_score: f64) -> Self {
        SaveStat {
            member: member.to_string(),
            saves,
            save_score,
        }
    }
}

/// Output of SourceParser::parse
#[derive(Debug, Clone)]
pub enum SourceRows {
    Chain(ChainReport),
    War(Vec<WarStat>),
    Saves(Vec<SaveStat>),
}

impl SourceRows {
    pub fn len(&self) -> usize {
        match self {
            SourceRows::Chain(report) => report.rows.len(),
            SourceRows::War(rows) => rows.len(),
            SourceRows::Saves(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn source_type(&self) -> SourceType {
        match self {
            SourceRows::Chain(_) => SourceType::ChainReport,
            SourceRows::War(_) => SourceType::WarScores,
            SourceRows::Saves(_) => SourceType::Saves,
        }
    }

    pub fn into_chain(self) -> Result<ChainReport> {
        match self {
            SourceRows::Chain(report) => Ok(report),
            other => anyhow::bail!("Expected a chain report, got {} rows", other.source_type().name()),
        }
    }

    /// War rows from either the CSV export or a ranked-war report
    pub fn into_war(self) -> Result<Vec<WarStat>> {
        match self {
            SourceRows::War(rows) => Ok(rows),
            other => anyhow::bail!("Expected war scores, got {} rows", other.source_type().name()),
        }
    }

    pub fn into_saves(self) -> Result<Vec<SaveStat>> {
        match self {
            SourceRows::Saves(rows) => Ok(rows),
            other => anyhow::bail!("Expected saves, got {} rows", other.source_type().name()),
        }
    }
}

/// Extra inputs some parsers need
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// Our faction in a ranked-war report
    pub faction_id: Option<String>,

    /// Skip filename detection and use this parser
    pub source_type: Option<SourceType>,
}

impl ParseOptions {
    pub fn with_source_type(mut self, source_type: SourceType) -> Self {
        self.source_type = Some(source_type);
        self
    }
}

// ============================================================================
// PARSER TRAIT
// ============================================================================

/// SourceParser - one implementation per export format
pub trait SourceParser: Send + Sync {
    /// Parse a file into typed rows
    fn parse(&self, file_path: &Path) -> Result<SourceRows>;

    /// Get the source type this parser handles
    fn source_type(&self) -> SourceType;

    /// Get parser version (for provenance in logs)
    fn version(&self) -> &str {
        "1.0.0"
    }
}

// ============================================================================
// FACTORY FUNCTIONS
// ============================================================================

/// Detect source type from the file name
///
/// ```
/// use faction_payout::{detect_source, SourceType};
/// use std::path::Path;
///
/// assert_eq!(detect_source(Path::new("Chain Report 4412.csv")).unwrap(), SourceType::ChainReport);
/// assert_eq!(detect_source(Path::new("saves.xlsx")).unwrap(), SourceType::Saves);
/// ```
pub fn detect_source(file_path: &Path) -> Result<SourceType> {
    let filename = file_name(file_path);
    let filename_lower = filename.to_lowercase();

    if filename_lower.contains("save") {
        return Ok(SourceType::Saves);
    }

    if filename_lower.ends_with(".json") {
        return Ok(SourceType::WarReportJson);
    }

    if filename_lower.contains("war") {
        return Ok(SourceType::WarScores);
    }

    if filename_lower.contains("chain") {
        return Ok(SourceType::ChainReport);
    }

    Err(anyhow::anyhow!(
        "Could not detect source type from filename: {}",
        filename
    ))
}

/// Get the parser for a source type
pub fn get_parser(source_type: SourceType, options: &ParseOptions) -> Box<dyn SourceParser> {
    match source_type {
        SourceType::ChainReport => Box::new(ChainReportParser::new()),
        SourceType::WarScores => Box::new(WarScoreParser::new()),
        SourceType::WarReportJson => Box::new(WarReportParser::new(options.faction_id.clone())),
        SourceType::Saves => Box::new(SaveParser::new()),
    }
}

/// War scores come as a ranked-war JSON or the CSV export, whatever the file is called
pub fn war_source_type(file_path: &Path) -> SourceType {
    let is_json = file_path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if is_json {
        SourceType::WarReportJson
    } else {
        SourceType::WarScores
    }
}

/// Detect (unless `options.source_type` is set), pick the parser and parse in one go
pub fn load_source(file_path: &Path, options: &ParseOptions) -> Result<SourceRows> {
    let source_type = match options.source_type {
        Some(source_type) => source_type,
        None => detect_source(file_path)?,
    };
    let parser = get_parser(source_type, options);
    let rows = parser.parse(file_path)?;

    info!(
        source = source_type.code(),
        parser_version = parser.version(),
        file = %file_path.display(),
        rows = rows.len(),
        "source loaded"
    );

    Ok(rows)
}

// ============================================================================
// CHAIN REPORT PARSER
// ============================================================================

/// Chain report CSV:
///   line 1: faction name
///   line 2: Member;Respect;Best;Avg;Attacks;Leave;Mug;Hosp;War;Assist;Retal;Overseas;Draw;Escape;Loss
///   then one row per member
pub struct ChainReportParser;

impl ChainReportParser {
    pub fn new() -> Self {
        ChainReportParser
    }

    pub fn parse_reader<R: Read>(&self, reader: R, filename: &str) -> Result<ChainReport> {
        let mut rdr = semicolon_reader(reader, false);
        let mut records = rdr.records();

        let faction_name = match records.next() {
            Some(record) => {
                let record = record
                    .with_context(|| format!("Failed to read faction line in {}", filename))?;
                clean_cell(record.get(0).unwrap_or(""))
            }
            None => anyhow::bail!("Chain report {} is empty", filename),
        };

        let headers: Vec<String> = match records.next() {
            Some(record) => record
                .with_context(|| format!("Failed to read header line in {}", filename))?
                .iter()
                .map(clean_cell)
                .collect(),
            None => anyhow::bail!("Chain report {} has no header line", filename),
        };
        let columns = ColumnMap::new(&headers);

        let mut rows = Vec::new();
        for (line_num, result) in records.enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse CSV line {} in {}", line_num + 3, filename)
            })?;

            // Member column is always first ("Member" or "Members" depending on export)
            let member = clean_cell(record.get(0).unwrap_or(""));
            if member.is_empty() {
                continue;
            }

            let number = |name: &str| {
                columns
                    .get(name)
                    .and_then(|idx| record.get(idx))
                    .map(parse_report_number)
                    .unwrap_or(0.0)
            };
            let count = |name: &str| to_count(number(name));

            rows.push(ChainStat {
                member,
                respect: number("respect"),
                best: number("best"),
                avg: number("avg"),
                attacks: count("attacks"),
                leave: count("leave"),
                mug: count("mug"),
                hosp: count("hosp"),
                war: count("war"),
                assist: count("assist"),
                retal: count("retal"),
                overseas: count("overseas"),
                draw: count("draw"),
                escape: count("escape"),
                loss: count("loss"),
            });
        }

        debug!(source = "chain", faction = %faction_name, rows = rows.len(), "chain report parsed");

        Ok(ChainReport {
            faction_name,
            chain_id: chain_id_from_filename(filename),
            rows,
        })
    }
}

impl SourceParser for ChainReportParser {
    fn parse(&self, file_path: &Path) -> Result<SourceRows> {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

        let report = self.parse_reader(file, &file_name(file_path))?;
        Ok(SourceRows::Chain(report))
    }

    fn source_type(&self) -> SourceType {
        SourceType::ChainReport
    }
}

impl Default for ChainReportParser {
    fn default() -> Self {
        Self::new()
    }
}

/// First run of digits in the file name ("Chain Report 4412.csv" -> "4412")
pub fn chain_id_from_filename(filename: &str) -> Option<String> {
    let digits: String = filename
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        None
    } else {
        Some(digits)
    }
}

// ============================================================================
// WAR SCORE PARSER
// ============================================================================

/// war_respect_data.csv: Member;war_respect
pub struct WarScoreParser;

impl WarScoreParser {
    pub fn new() -> Self {
        WarScoreParser
    }

    pub fn parse_reader<R: Read>(&self, reader: R, filename: &str) -> Result<Vec<WarStat>> {
        let mut rdr = semicolon_reader(reader, true);
        let headers: Vec<String> = rdr
            .headers()
            .with_context(|| format!("Failed to read headers in {}", filename))?
            .iter()
            .map(clean_cell)
            .collect();
        let columns = ColumnMap::new(&headers);

        let member_col = columns.get("member").unwrap_or(0);
        let score_col = columns
            .get("war_respect")
            .or_else(|| columns.get("score"))
            .unwrap_or(1);

        let mut rows = Vec::new();
        for (line_num, result) in rdr.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse CSV line {} in {}", line_num + 2, filename)
            })?;

            let member = clean_cell(record.get(member_col).unwrap_or(""));
            if member.is_empty() {
                continue;
            }

            let score = parse_report_number(record.get(score_col).unwrap_or(""));
            rows.push(WarStat::new(&member, score));
        }

        Ok(rows)
    }
}

impl SourceParser for WarScoreParser {
    fn parse(&self, file_path: &Path) -> Result<SourceRows> {
        let file = File::open(file_path)
            .with_context(|| format!("Failed to open file: {}", file_path.display()))?;

        let rows = self.parse_reader(file, &file_name(file_path))?;
        Ok(SourceRows::War(rows))
    }

    fn source_type(&self) -> SourceType {
        SourceType::WarScores
    }
}

impl Default for WarScoreParser {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// SAVES PARSER
// ============================================================================

/// saves.csv (Member;Saves;Save_Score) or saves.xlsx with the same header row
pub struct SaveParser;

impl SaveParser {
    pub fn new() -> Self {
        SaveParser
    }

    pub fn parse_reader<R: Read>(&self, reader: R, filename: &str) -> Result<Vec<SaveStat>> {
        let mut rdr = semicolon_reader(reader, true);
        let headers: Vec<String> = rdr
            .headers()
            .with_context(|| format!("Failed to read headers in {}", filename))?
            .iter()
            .map(clean_cell)
            .collect();
        let columns = SaveColumns::new(&headers);

        let mut rows = Vec::new();
        for (line_num, result) in rdr.records().enumerate() {
            let record = result.with_context(|| {
                format!("Failed to parse CSV line {} in {}", line_num + 2, filename)
            })?;

            let cell = |idx: usize| record.get(idx).unwrap_or("").to_string();
            if let Some(row) = columns.row(cell(columns.member), &cell(columns.saves), &cell(columns.save_score)) {
                rows.push(row);
            }
        }

        Ok(rows)
    }

    /// First sheet of a workbook, header row first
    pub fn parse_workbook(&self, file_path: &Path) -> Result<Vec<SaveStat>> {
        let mut workbook = calamine::open_workbook_auto(file_path)
            .with_context(|| format!("Failed to open workbook: {}", file_path.display()))?;

        let sheet_name = workbook
            .sheet_names()
            .first()
            .cloned()
            .ok_or_else(|| anyhow::anyhow!("Workbook has no sheets: {}", file_path.display()))?;

        let range = workbook
            .worksheet_range(&sheet_name)
            .with_context(|| format!("Failed to read sheet '{}' in {}", sheet_name, file_path.display()))?;

        let mut sheet_rows = range.rows();
        let headers: Vec<String> = match sheet_rows.next() {
            Some(row) => row.iter().map(|c| clean_cell(&cell_text(c))).collect(),
            None => return Ok(Vec::new()),
        };
        let columns = SaveColumns::new(&headers);

        let cell = |row: &[calamine::Data], idx: usize| row.get(idx).map(cell_text).unwrap_or_default();

        let rows = sheet_rows
            .filter_map(|row| {
                columns.row(
                    cell(row, columns.member),
                    &cell(row, columns.saves),
                    &cell(row, columns.save_score),
                )
            })
            .collect();

        Ok(rows)
    }
}

impl SourceParser for SaveParser {
    fn parse(&self, file_path: &Path) -> Result<SourceRows> {
        let extension = file_path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        let rows = match extension.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => self.parse_workbook(file_path)?,
            _ => {
                let file = File::open(file_path)
                    .with_context(|| format!("Failed to open file: {}", file_path.display()))?;
                self.parse_reader(file, &file_name(file_path))?
            }
        };

        Ok(SourceRows::Saves(rows))
    }

    fn source_type(&self) -> SourceType {
        SourceType::Saves
    }
}

impl Default for SaveParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Column positions of the saves sheet, shared by the CSV and XLSX paths
struct SaveColumns {
    member: usize,
    saves: usize,
    save_score: usize,
}

impl SaveColumns {
    fn new(headers: &[String]) -> Self {
        let columns = ColumnMap::new(headers);
        SaveColumns {
            member: columns.get("member").unwrap_or(0),
            saves: columns.get("saves").unwrap_or(1),
            save_score: columns.get("save_score").unwrap_or(2),
        }
    }

    fn row(&self, member: String, saves: &str, save_score: &str) -> Option<SaveStat> {
        let member = clean_cell(&member);
        if member.is_empty() {
            return None;
        }

        Some(SaveStat {
            member,
            saves: to_count(parse_report_number(saves)),
            save_score: parse_report_number(save_score),
        })
    }
}

fn cell_text(data: &calamine::Data) -> String {
    match data {
        calamine::Data::Empty => String::new(),
        calamine::Data::String(s) => s.clone(),
        calamine::Data::Float(f) => format!("{}", f),
        calamine::Data::Int(i) => format!("{}", i),
        calamine::Data::Bool(b) => format!("{}", b),
        other => format!("{:?}", other),
    }
}

// ============================================================================
// NUMBER PARSING
// ============================================================================

/// Parse a number from a report export. The exports mix conventions:
///   "2,368"      -> 2368      (comma thousands)
///   "1.234,56"   -> 1234.56   (European)
///   "1,234.56"   -> 1234.56   (US)
///   "26,17"      -> 26.17     (decimal comma)
///   "1.234.567"  -> 1234567   (dot thousands)
/// Empty cells and "nan" are 0. Garbage is 0 and logged.
pub fn parse_report_number(value: &str) -> f64 {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != '%')
        .collect();

    if cleaned.is_empty() || cleaned.eq_ignore_ascii_case("nan") {
        return 0.0;
    }

    match normalize_separators(&cleaned).parse::<f64>() {
        Ok(v) if v.is_finite() => v,
        _ => {
            warn!(value, "unparseable number, using 0");
            0.0
        }
    }
}

/// Parse a US-formatted amount typed by a user ("$4,209,000,000.00")
pub fn parse_us_number(value: &str) -> Result<f64> {
    let cleaned: String = value
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != ',')
        .collect();

    let parsed: f64 = cleaned
        .parse()
        .with_context(|| format!("Invalid amount: '{}'", value))?;

    if !parsed.is_finite() {
        anyhow::bail!("Invalid amount: '{}'", value);
    }

    Ok(parsed)
}

/// Round a parsed count; negatives and NaN become 0
pub fn to_count(value: f64) -> u32 {
    if value.is_finite() && value > 0.0 {
        value.round().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

fn normalize_separators(s: &str) -> String {
    match (s.rfind(','), s.rfind('.')) {
        // Both present: the later one is the decimal separator
        (Some(comma), Some(dot)) => {
            if comma > dot {
                s.replace('.', "").replace(',', ".")
            } else {
                s.replace(',', "")
            }
        }
        (Some(_), None) => {
            if is_thousands_grouped(s, ',') {
                s.replace(',', "")
            } else if s.matches(',').count() == 1 {
                s.replace(',', ".")
            } else {
                s.to_string()
            }
        }
        (None, Some(_)) => {
            if s.matches('.').count() > 1 {
                s.replace('.', "")
            } else {
                s.to_string()
            }
        }
        (None, None) => s.to_string(),
    }
}

/// "2,368" / "1,234,567": head of 1-3 digits then groups of exactly 3
fn is_thousands_grouped(s: &str, sep: char) -> bool {
    let digits = s.trim_start_matches(|c| c == '-' || c == '+');
    let mut groups = digits.split(sep);

    // A leading zero ("0,500") is never a thousands head
    let head_ok = groups
        .next()
        .map(|head| {
            !head.is_empty()
                && head.len() <= 3
                && !head.starts_with('0')
                && head.chars().all(|c| c.is_ascii_digit())
        })
        .unwrap_or(false);

    let mut tail_count = 0;
    let tail_ok = groups.all(|group| {
        tail_count += 1;
        group.len() == 3 && group.chars().all(|c| c.is_ascii_digit())
    });

    head_ok && tail_ok && tail_count > 0
}

// ============================================================================
// CSV HELPERS
// ============================================================================

fn semicolon_reader<R: Read>(reader: R, has_headers: bool) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .delimiter(b';')
        .has_headers(has_headers)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader)
}

/// Header name -> column index, case-insensitive
struct ColumnMap {
    positions: HashMap<String, usize>,
}

impl ColumnMap {
    fn new(headers: &[String]) -> Self {
        let positions = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.to_lowercase(), idx))
            .collect();

        ColumnMap { positions }
    }

    fn get(&self, name: &str) -> Option<usize> {
        self.positions.get(&name.to_lowercase()).copied()
    }
}

/// Trim whitespace and the UTF-8 BOM some exports start with
fn clean_cell(cell: &str) -> String {
    cell.trim().trim_start_matches('\u{feff}').trim().to_string()
}

fn file_name(file_path: &Path) -> String {
    file_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("unknown")
        .to_string()
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const CHAIN_CSV: &str = "\
EPIC Mafia;;;;;;;;;;;;;;
Member;Respect;Best;Avg;Attacks;Leave;Mug;Hosp;War;Assist;Retal;Overseas;Draw;Escape;Loss
JlambJLAMB[456];1.234,56;40,5;10,2;121;100;1;20;90;0;2;0;0;0;0
GaloSengenGALOSENGEN[2718];2,368;12;8,5;300;250;10;40;280;1;0;3;0;0;1
;;;;;;;;;;;;;;
";

    #[test]
    fn test_source_type_names() {
        assert_eq!(SourceType::ChainReport.name(), "Chain Report");
        assert_eq!(SourceType::WarScores.name(), "War Scores");
        assert_eq!(SourceType::WarReportJson.name(), "Ranked War Report");
        assert_eq!(SourceType::Saves.name(), "Saves");
    }

    #[test]
    fn test_detect_source() {
        assert_eq!(detect_source(Path::new("Chain Report 4412.csv")).unwrap(), SourceType::ChainReport);
        assert_eq!(detect_source(Path::new("war_respect_data.csv")).unwrap(), SourceType::WarScores);
        assert_eq!(detect_source(Path::new("rankedwar_26833.json")).unwrap(), SourceType::WarReportJson);
        assert_eq!(detect_source(Path::new("saves.xlsx")).unwrap(), SourceType::Saves);
        assert_eq!(detect_source(Path::new("saves.csv")).unwrap(), SourceType::Saves);
    }

    #[test]
    fn test_detect_source_unknown() {
        assert!(detect_source(Path::new("members.csv")).is_err());
    }

    #[test]
    fn test_get_parser_source_types() {
        let options = ParseOptions::default();
        assert_eq!(get_parser(SourceType::ChainReport, &options).source_type(), SourceType::ChainReport);
        assert_eq!(get_parser(SourceType::Saves, &options).source_type(), SourceType::Saves);
        assert_eq!(get_parser(SourceType::WarReportJson, &options).source_type(), SourceType::WarReportJson);
    }

    #[test]
    fn test_chain_report_parse() {
        let report = ChainReportParser::new()
            .parse_reader(CHAIN_CSV.as_bytes(), "Chain Report 4412.csv")
            .unwrap();

        assert_eq!(report.faction_name, "EPIC Mafia");
        assert_eq!(report.chain_id.as_deref(), Some("4412"));
        assert_eq!(report.rows.len(), 2, "blank member row is skipped");

        let jlamb = &report.rows[0];
        assert_eq!(jlamb.member, "JlambJLAMB[456]");
        assert!((jlamb.respect - 1234.56).abs() < 1e-9);
        assert!((jlamb.best - 40.5).abs() < 1e-9);
        assert_eq!(jlamb.attacks, 121);
        assert_eq!(jlamb.war, 90);
        assert_eq!(jlamb.outside(), 31);

        let galo = &report.rows[1];
        assert_eq!(galo.respect, 2368.0);
        assert_eq!(galo.hosp, 40);
        assert_eq!(galo.loss, 1);
    }

    #[test]
    fn test_chain_report_empty_is_error() {
        assert!(ChainReportParser::new().parse_reader("".as_bytes(), "chain.csv").is_err());
        assert!(ChainReportParser::new().parse_reader("Faction\n".as_bytes(), "chain.csv").is_err());
    }

    #[test]
    fn test_war_score_parse() {
        let csv = "Member;war_respect\nJlamb[456];512.25\nGaloSengen[2718];1,024.5\n;3\n";
        let rows = WarScoreParser::new().parse_reader(csv.as_bytes(), "war_respect_data.csv").unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], WarStat::new("Jlamb[456]", 512.25));
        assert_eq!(rows[1].score, 1024.5);
    }

    #[test]
    fn test_saves_parse_csv() {
        let csv = "Member;Saves;Save_Score\nJlamb;3;45,5\nghost[9];1;10\n";
        let rows = SaveParser::new().parse_reader(csv.as_bytes(), "saves.csv").unwrap();

        assert_eq!(rows, vec![SaveStat::new("Jlamb", 3, 45.5), SaveStat::new("ghost[9]", 1, 10.0)]);
    }

    #[test]
    fn test_saves_parse_columns_in_any_order() {
        let csv = "Save_Score;Member;Saves\n12.5;Jlamb;2\n";
        let rows = SaveParser::new().parse_reader(csv.as_bytes(), "saves.csv").unwrap();

        assert_eq!(rows, vec![SaveStat::new("Jlamb", 2, 12.5)]);
    }

    #[test]
    fn test_parse_report_number_formats() {
        assert_eq!(parse_report_number("2,368"), 2368.0);
        assert_eq!(parse_report_number("1,234,567"), 1234567.0);
        assert!((parse_report_number("1.234,56") - 1234.56).abs() < 1e-9);
        assert!((parse_report_number("1,234.56") - 1234.56).abs() < 1e-9);
        assert!((parse_report_number("26,17") - 26.17).abs() < 1e-9);
        assert_eq!(parse_report_number("1.234.567"), 1234567.0);
        assert_eq!(parse_report_number("42"), 42.0);
        assert_eq!(parse_report_number("-3,5"), -3.5);
        assert_eq!(parse_report_number("12%"), 12.0);
    }

    #[test]
    fn test_parse_report_number_leading_zero_is_decimal_comma() {
        assert_eq!(parse_report_number("0,500"), 0.5);
        assert_eq!(parse_report_number("-0,250"), -0.25);
        assert_eq!(parse_report_number("1,500"), 1500.0);
    }

    #[test]
    fn test_parse_report_number_degrades_to_zero() {
        assert_eq!(parse_report_number(""), 0.0);
        assert_eq!(parse_report_number("nan"), 0.0);
        assert_eq!(parse_report_number("abc"), 0.0);
    }

    #[test]
    fn test_parse_us_number() {
        assert_eq!(parse_us_number("$4,209,000,000.00").unwrap(), 4_209_000_000.0);
        assert_eq!(parse_us_number("1000").unwrap(), 1000.0);
        assert!(parse_us_number("lots").is_err());
        assert!(parse_us_number("inf").is_err());
    }

    #[test]
    fn test_to_count() {
        assert_eq!(to_count(2.6), 3);
        assert_eq!(to_count(-1.0), 0);
        assert_eq!(to_count(f64::NAN), 0);
    }

    #[test]
    fn test_chain_id_from_filename() {
        assert_eq!(chain_id_from_filename("Chain Report 4412.csv"), Some("4412".to_string()));
        assert_eq!(chain_id_from_filename("chain.csv"), None);
    }

    // ------------------------------------------------------------------
    // Loading from disk
    // ------------------------------------------------------------------

    fn fixture(name: &str) -> std::path::PathBuf {
        Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures")
            .join(name)
    }

    fn write_file(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_source_detects_each_export() {
        let dir = tempfile::TempDir::new().unwrap();
        let options = ParseOptions::default();

        let chain = write_file(&dir, "Chain Report 4412.csv", CHAIN_CSV);
        let report = load_source(&chain, &options).unwrap().into_chain().unwrap();
        assert_eq!(report.faction_name, "EPIC Mafia");
        assert_eq!(report.chain_id.as_deref(), Some("4412"));
        assert_eq!(report.rows.len(), 2);

        let war = write_file(&dir, "war_respect_data.csv", "Member;war_respect\nJlamb[456];512,25\n");
        let rows = load_source(&war, &options).unwrap().into_war().unwrap();
        assert_eq!(rows, vec![WarStat::new("Jlamb[456]", 512.25)]);

        let saves = write_file(&dir, "saves.csv", "Member;Saves;Save_Score\nJlamb;3;45,5\n");
        let rows = load_source(&saves, &options).unwrap().into_saves().unwrap();
        assert_eq!(rows, vec![SaveStat::new("Jlamb", 3, 45.5)]);

        println!("✅ Loaded chain, war and saves exports from {}", dir.path().display());
    }

    #[test]
    fn test_load_source_with_explicit_type_ignores_filename() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_file(&dir, "export.csv", CHAIN_CSV);

        assert!(load_source(&path, &ParseOptions::default()).is_err());

        let options = ParseOptions::default().with_source_type(SourceType::ChainReport);
        let rows = load_source(&path, &options).unwrap();
        assert_eq!(rows.source_type(), SourceType::ChainReport);
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_load_source_ranked_war_json() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = write_file(
            &dir,
            "scores.json",
            r#"{"rankedwarreport": {"war": {"start": 0, "end": 3600},
                "factions": {"40959": {"name": "EPIC Mafia", "members": {
                    "456": {"name": "Jlamb", "level": 50, "attacks": 4, "score": 40.0}}}}}}"#,
        );

        assert_eq!(war_source_type(&path), SourceType::WarReportJson);

        let options = ParseOptions {
            faction_id: Some("40959".to_string()),
            source_type: Some(war_source_type(&path)),
        };
        let rows = load_source(&path, &options).unwrap().into_war().unwrap();
        assert_eq!(rows[0].member, "Jlamb[456]");
        assert_eq!(rows[0].score, 40.0);
    }

    #[test]
    fn test_load_source_missing_file_is_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("Chain Report 1.csv");
        assert!(load_source(&missing, &ParseOptions::default()).is_err());
    }

    #[test]
    fn test_into_wrong_kind_is_error() {
        let rows = SourceRows::Saves(vec![SaveStat::new("Jlamb", 1, 2.0)]);
        assert!(rows.clone().into_chain().is_err());
        assert!(rows.clone().into_war().is_err());
        assert_eq!(rows.into_saves().unwrap().len(), 1);
    }

    #[test]
    fn test_saves_workbook() {
        let rows = SaveParser::new().parse_workbook(&fixture("saves.xlsx")).unwrap();

        assert_eq!(
            rows,
            vec![SaveStat::new("JlambJLAMB[456]", 3, 45.5), SaveStat::new("Ghost[789]", 1, 10.0)]
        );
    }

    #[test]
    fn test_load_source_saves_workbook() {
        let rows = load_source(&fixture("saves.xlsx"), &ParseOptions::default())
            .unwrap()
            .into_saves()
            .unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_share_of_attacks() {
        let stat = ChainStat::new("x", 0.0, 200, 150);
        assert_eq!(stat.share_of_attacks(stat.war), 75.0);
        assert_eq!(ChainStat::default().share_of_attacks(3), 0.0);
    }
}
