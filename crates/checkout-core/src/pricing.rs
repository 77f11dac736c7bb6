//! Quote Pricing
//!
//! Maps the project options a visitor picks on the quote form to a price.
//! Pure and deterministic: no I/O, no clock, no randomness.
//!
//! ```text
//! total = round((base[type] + (pages - 1) * per_page + Σ feature[f])
//!               * complexity * timeline)
//! ```
//!
//! Amounts are major currency units (rupees for the default INR table).

use std::collections::{BTreeSet, HashMap};

use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;

/// Kind of project being quoted
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectType {
    Landing,
    Portfolio,
    Blog,
    Business,
    Ecommerce,
    WebApp,
}

impl ProjectType {
    pub const ALL: [Self; 6] = [
        Self::Landing,
        Self::Portfolio,
        Self::Blog,
        Self::Business,
        Self::Ecommerce,
        Self::WebApp,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::Portfolio => "portfolio",
            Self::Blog => "blog",
            Self::Business => "business",
            Self::Ecommerce => "ecommerce",
            Self::WebApp => "web_app",
        }
    }
}

/// Add-on feature identifier.
///
/// Kept as an open string so a quote built from a stale feature list still
/// prices; ids missing from the table cost nothing.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureId(String);

impl FeatureId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into().trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeatureId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl std::fmt::Display for FeatureId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Build complexity tier, ordered cheapest first
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    #[default]
    Simple,
    Moderate,
    Complex,
}

impl Complexity {
    pub const ALL: [Self; 3] = [Self::Simple, Self::Moderate, Self::Complex];
}

/// Delivery timeline tier, ordered cheapest first
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeline {
    #[default]
    Standard,
    Priority,
    Urgent,
}

impl Timeline {
    pub const ALL: [Self; 3] = [Self::Standard, Self::Priority, Self::Urgent];
}

/// Options selected on the quote form
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct QuoteRequest {
    pub project_type: ProjectType,

    #[validate(range(min = 1, max = 500, message = "must be between 1 and 500"))]
    pub page_count: u32,

    #[serde(default)]
    pub features: BTreeSet<FeatureId>,

    #[serde(default)]
    pub complexity: Complexity,

    #[serde(default)]
    pub timeline: Timeline,
}

impl QuoteRequest {
    /// Single-page request with no add-ons at the cheapest tiers
    pub fn new(project_type: ProjectType) -> Self {
        Self {
            project_type,
            page_count: 1,
            features: BTreeSet::new(),
            complexity: Complexity::default(),
            timeline: Timeline::default(),
        }
    }

    pub const fn pages(mut self, page_count: u32) -> Self {
        self.page_count = page_count;
        self
    }

    pub fn feature(mut self, id: impl Into<FeatureId>) -> Self {
        self.features.insert(id.into());
        self
    }

    pub const fn complexity(mut self, complexity: Complexity) -> Self {
        self.complexity = complexity;
        self
    }

    pub const fn timeline(mut self, timeline: Timeline) -> Self {
        self.timeline = timeline;
        self
    }
}

/// Computed price breakdown
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    /// Project base price plus extra pages
    pub base_amount: Decimal,

    /// Sum of known add-on features
    pub features_amount: Decimal,

    /// complexity × timeline
    pub multiplier_applied: Decimal,

    /// Rounded to whole currency units
    pub total_amount: Decimal,
}

impl PriceQuote {
    pub fn subtotal(&self) -> Decimal {
        self.base_amount + self.features_amount
    }
}

/// Price lists the calculator reads from
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PriceTable {
    pub base_prices: HashMap<ProjectType, Decimal>,
    pub per_page_rate: Decimal,
    pub feature_prices: HashMap<FeatureId, Decimal>,
    pub complexity_multipliers: HashMap<Complexity, Decimal>,
    pub timeline_multipliers: HashMap<Timeline, Decimal>,
}

impl Default for PriceTable {
    fn default() -> Self {
        let base_prices = HashMap::from([
            (ProjectType::Landing, dec!(10000)),
            (ProjectType::Portfolio, dec!(15000)),
            (ProjectType::Blog, dec!(20000)),
            (ProjectType::Business, dec!(25000)),
            (ProjectType::Ecommerce, dec!(60000)),
            (ProjectType::WebApp, dec!(90000)),
        ]);

        let feature_prices = [
            ("seo", dec!(6000)),
            ("cms", dec!(8000)),
            ("blog", dec!(5000)),
            ("analytics", dec!(3000)),
            ("contact_form", dec!(2000)),
            ("payments", dec!(12000)),
            ("auth", dec!(10000)),
            ("multilingual", dec!(9000)),
            ("live_chat", dec!(4000)),
        ]
        .into_iter()
        .map(|(id, price)| (FeatureId::new(id), price))
        .collect();

        Self {
            base_prices,
            per_page_rate: dec!(1000),
            feature_prices,
            complexity_multipliers: HashMap::from([
                (Complexity::Simple, dec!(1.0)),
                (Complexity::Moderate, dec!(1.3)),
                (Complexity::Complex, dec!(1.6)),
            ]),
            timeline_multipliers: HashMap::from([
                (Timeline::Standard, dec!(1.0)),
                (Timeline::Priority, dec!(1.25)),
                (Timeline::Urgent, dec!(1.5)),
            ]),
        }
    }
}

impl PriceTable {
    /// Price a request.
    ///
    /// Callers validate the request first (see [`PriceTable::quote_checked`]);
    /// a zero page count is priced as one page rather than going negative.
    pub fn quote(&self, request: &QuoteRequest) -> PriceQuote {
        let base = self
            .base_prices
            .get(&request.project_type)
            .copied()
            .unwrap_or(Decimal::ZERO);
        let extra_pages = Decimal::from(request.page_count.saturating_sub(1));
        let base_amount = base + extra_pages * self.per_page_rate;

        let features_amount: Decimal = request
            .features
            .iter()
            .filter_map(|id| {
                let price = self.feature_prices.get(id).copied();
                if price.is_none() {
                    tracing::debug!(feature = %id, "Ignoring unknown feature id");
                }
                price
            })
            .sum();

        let complexity = self
            .complexity_multipliers
            .get(&request.complexity)
            .copied()
            .unwrap_or(Decimal::ONE);
        let timeline = self
            .timeline_multipliers
            .get(&request.timeline)
            .copied()
            .unwrap_or(Decimal::ONE);
        let multiplier_applied = complexity * timeline;

        let total_amount = ((base_amount + features_amount) * multiplier_applied)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);

        PriceQuote {
            base_amount,
            features_amount,
            multiplier_applied,
            total_amount,
        }
    }

    /// Validate then price
    pub fn quote_checked(&self, request: &QuoteRequest) -> Result<PriceQuote> {
        request.validate()?;
        Ok(self.quote(request))
    }

    /// Known feature ids with their prices, cheapest first
    pub fn features(&self) -> Vec<(&FeatureId, Decimal)> {
        let mut features: Vec<_> = self.feature_prices.iter().map(|(id, p)| (id, *p)).collect();
        features.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));
        features
    }
}

/// Price a request against the default table
pub fn compute_quote(request: &QuoteRequest) -> PriceQuote {
    PriceTable::default().quote(request)
}
