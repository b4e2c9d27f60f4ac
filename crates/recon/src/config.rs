use std::path::Path;

use serde::Deserialize;

use crate::error::ReconError;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Run configuration. Every section is optional; an empty TOML document
/// yields the defaults used by the courier reports.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ReconConfig {
    pub name: String,
    pub tolerance: ToleranceConfig,
    pub windows: WindowConfig,
    pub batch: BatchConfig,
    pub dates: DateConfig,
    pub bank: BankConfig,
    pub categories: CategoryRules,
}

impl Default for ReconConfig {
    fn default() -> Self {
        Self {
            name: "courier".into(),
            tolerance: ToleranceConfig::default(),
            windows: WindowConfig::default(),
            batch: BatchConfig::default(),
            dates: DateConfig::default(),
            bank: BankConfig::default(),
            categories: CategoryRules::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tolerance + windows
// ---------------------------------------------------------------------------

/// Money tolerances, in cents.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToleranceConfig {
    /// Pairwise amount tolerance (claim vs deposit, receipt vs debit).
    pub amount_cents: i64,
    /// Tolerance for a batch sum against one deposit. Looser than the
    /// pairwise tolerance because rounding compounds across the subset.
    pub batch_cents: i64,
}

impl Default for ToleranceConfig {
    fn default() -> Self {
        Self {
            amount_cents: 50,
            batch_cents: 100,
        }
    }
}

/// Date windows in days, per call site.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WindowConfig {
    /// Lookahead from a trip's completion date for a bank deposit.
    pub trip_match: u32,
    /// ± window for claim↔deposit and receipt↔debit tolerance matching.
    pub refund_match: u32,
    /// ± window around a deposit for batch candidates.
    pub batch_match: u32,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            trip_match: 3,
            refund_match: 7,
            batch_match: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Largest subset the batch resolver will try (smallest is always 2).
    pub max_subset_size: usize,
    /// Search nodes one deposit may cost before the resolver gives up on it.
    pub max_nodes: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            max_subset_size: 5,
            max_nodes: 50_000,
        }
    }
}

// ---------------------------------------------------------------------------
// Dates + bank filter
// ---------------------------------------------------------------------------

/// Which clock timestamps are normalized to before taking the calendar day.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeReference {
    /// Wall-clock time in the offset the source recorded.
    #[default]
    SourceLocal,
    /// Convert every offset-carrying timestamp to UTC.
    Utc,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DateConfig {
    pub reference: TimeReference,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct BankConfig {
    /// Only deposits whose description contains one of these (case-insensitive)
    /// are treated as platform payouts. Empty means every deposit qualifies.
    pub payout_keywords: Vec<String>,
}

impl BankConfig {
    pub fn is_payout(&self, description: &str) -> bool {
        if self.payout_keywords.is_empty() {
            return true;
        }
        let desc = description.to_uppercase();
        self.payout_keywords
            .iter()
            .any(|k| desc.contains(&k.to_uppercase()))
    }
}

// ---------------------------------------------------------------------------
// Category rule table
// ---------------------------------------------------------------------------

/// One named keyword group, e.g. `Fast Food` → `["MCDONALD", "WENDYS"]`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct KeywordGroup {
    pub name: String,
    pub keywords: Vec<String>,
}

impl KeywordGroup {
    fn new(name: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.into(),
            keywords: keywords.iter().map(|k| (*k).to_string()).collect(),
        }
    }

    /// Upper-cased substring match against an already upper-cased description.
    pub fn matches_upper(&self, upper_description: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| upper_description.contains(&k.to_uppercase()))
    }
}

/// Ordered keyword tables for the spending classifier. Group order inside
/// each table is significant: the first matching group names the subcategory.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CategoryRules {
    pub business: Vec<KeywordGroup>,
    pub financial: Vec<KeywordGroup>,
    pub personal: Vec<KeywordGroup>,
}

impl Default for CategoryRules {
    fn default() -> Self {
        Self {
            business: vec![KeywordGroup::new(
                "EV Charging",
                &[
                    "TESLA",
                    "SUPERCHARGER",
                    "EVGO",
                    "XEAL EV",
                    "BLINK CHARGING",
                    "EV CHARGING",
                    "HYPERFUEL",
                    "CHARGING",
                ],
            )],
            financial: vec![KeywordGroup::new(
                "Transfers/Fees",
                &[
                    "INSTANT TRANSFER",
                    "ACH DEBIT",
                    "ACCOUNT UNLOAD",
                    "ATM WITHDRAWAL",
                    "FEE FOR",
                    "OUT-OF-NETWORK",
                    "AFFIRM",
                    "CARD PAYMENT",
                ],
            )],
            personal: vec![
                KeywordGroup::new(
                    "Fast Food",
                    &[
                        "RAISING CANES",
                        "MCDONALD",
                        "WHATABURGER",
                        "TACO BELL",
                        "BURGER KING",
                        "JACK IN THE BOX",
                        "SONIC DRIVE",
                        "WENDYS",
                        "CHIPOTLE",
                        "POPEYES",
                        "PANDA EXPRESS",
                        "LITTLE CAESAR",
                    ],
                ),
                KeywordGroup::new("Restaurant", &["CAFE", "DELI", "ITALIAN", "BURGER", "PIZZA"]),
                KeywordGroup::new(
                    "Coffee & Beverages",
                    &["STARBUCKS", "DUTCH BROS", "COFFEE", "DONUTS", "DUNKIN"],
                ),
                KeywordGroup::new(
                    "Groceries",
                    &["KROGER", "TOM THUMB", "ALDI", "ALBERTSONS", "WAL-MART", "WM SUPERCENTER"],
                ),
                KeywordGroup::new(
                    "Convenience Store",
                    &["DOLLAR TREE", "DOLLAR GENERAL", "7-ELEVEN", "RACETRAC", "BUC-EE"],
                ),
                KeywordGroup::new("Pharmacy/Health", &["CVS", "WALGREENS", "PHARMACY"]),
                KeywordGroup::new(
                    "Retail Shopping",
                    &["TARGET", "HOME DEPOT", "OLD NAVY", "BEAUTY SUPPLY"],
                ),
                KeywordGroup::new("Phone/Utilities", &["TMOBILE", "T-MOBILE"]),
                KeywordGroup::new("Gas Station", &["SHELL", "EXXON", "CHEVRON", "FUEL CITY"]),
                KeywordGroup::new("Alcohol", &["BEER", "WINE", "LIQUOR"]),
            ],
        }
    }
}

// ---------------------------------------------------------------------------
// Parse + Validate
// ---------------------------------------------------------------------------

/// Upper bound on `batch.max_subset_size`; C(n, k) grows too fast beyond it.
pub const MAX_SUBSET_SIZE_LIMIT: usize = 8;

impl ReconConfig {
    pub fn from_toml(input: &str) -> Result<Self, ReconError> {
        let config: ReconConfig =
            toml::from_str(input).map_err(|e| ReconError::ConfigParse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ReconError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml(&text)
    }

    pub fn validate(&self) -> Result<(), ReconError> {
        if self.tolerance.amount_cents < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance.amount_cents must be >= 0, got {}",
                self.tolerance.amount_cents
            )));
        }
        if self.tolerance.batch_cents < 0 {
            return Err(ReconError::ConfigValidation(format!(
                "tolerance.batch_cents must be >= 0, got {}",
                self.tolerance.batch_cents
            )));
        }

        let size = self.batch.max_subset_size;
        if !(2..=MAX_SUBSET_SIZE_LIMIT).contains(&size) {
            return Err(ReconError::ConfigValidation(format!(
                "batch.max_subset_size must be between 2 and {MAX_SUBSET_SIZE_LIMIT}, got {size}"
            )));
        }

        if self.batch.max_nodes == 0 {
            return Err(ReconError::ConfigValidation(
                "batch.max_nodes must be > 0".into(),
            ));
        }

        if self.bank.payout_keywords.iter().any(|k| k.trim().is_empty()) {
            return Err(ReconError::ConfigValidation(
                "bank.payout_keywords must not contain empty strings".into(),
            ));
        }

        for (table, groups) in [
            ("business", &self.categories.business),
            ("financial", &self.categories.financial),
            ("personal", &self.categories.personal),
        ] {
            for group in groups {
                if group.keywords.is_empty() {
                    return Err(ReconError::ConfigValidation(format!(
                        "categories.{table}: group '{}' has no keywords",
                        group.name
                    )));
                }
                if group.keywords.iter().any(|k| k.trim().is_empty()) {
                    return Err(ReconError::ConfigValidation(format!(
                        "categories.{table}: group '{}' has an empty keyword",
                        group.name
                    )));
                }
            }
        }

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
