// Faction Payout - Core Library
// Chain report + war scores + saves -> per-member war earnings

pub mod names;
pub mod parser;
pub mod merge;
pub mod earnings;
pub mod chain;
pub mod war;
pub mod report;
pub mod config;

// Re-export commonly used types
pub use names::{
    canonicalize, extract_member_id, names_match,
    MatchKind, MemberIndex, MemberRecord, NameReconciler, DEFAULT_TRUNCATE_THRESHOLD,
};
pub use parser::{
    SourceParser, SourceRows, SourceType, ParseOptions,
    ChainStat, ChainReport, WarStat, SaveStat,
    detect_source, get_parser, load_source, war_source_type,
    ChainReportParser, WarScoreParser, SaveParser,
    parse_report_number, parse_us_number,
};
pub use merge::{merge, MergedMember, MergeReport, WarRespectMerger, WarSource};
pub use earnings::{
    distribute, EarningsDistributor, EarningsReport, EarningsRow, PayoutParams, PoolSummary,
};
pub use chain::{rank_by_respect, ChainSummary};
pub use war::{
    FactionSide, FactionStats, MemberWarStats, RankedWarReport, WarReport, WarReportParser,
};
pub use report::{
    apply_template, format_european_number, format_us_currency, format_us_number,
    render_chain_html, render_chain_table, render_earnings_html, render_earnings_table,
    render_war_html, render_war_tables, summary_placeholders, write_earnings_csv, write_html,
};
pub use config::PayoutConfig;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
