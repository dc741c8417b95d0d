use std::collections::HashMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Result, StatementError};

/// One recognized financial line item: the label it is stored under, the
/// alternate spellings statements use for it, and whether a negative value
/// is meaningful for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldDefinition {
    #[schemars(
        description = "The authoritative label for this line item, used as the storage key (e.g. 'Nett turnover')"
    )]
    pub canonical_name: String,

    #[serde(default)]
    #[schemars(
        description = "Alternate spellings/phrasings that denote the same line item. Matching is case- and whitespace-insensitive."
    )]
    pub aliases: Vec<String>,

    #[serde(default)]
    #[schemars(
        description = "Whether the value may be negative (profit/loss lines). Fields without this flag are clamped to their absolute value."
    )]
    pub allow_negative: bool,
}

impl FieldDefinition {
    pub fn new(canonical_name: impl Into<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            aliases: Vec::new(),
            allow_negative: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Marks the field as a profit/loss line whose sign must be preserved.
    pub fn signed(mut self) -> Self {
        self.allow_negative = true;
        self
    }

    /// Canonical name plus all aliases, in declaration order.
    pub fn search_terms(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.canonical_name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Named vocabulary of recognized fields.
///
/// Statement layouts changed across revisions of the source documents, so the
/// vocabulary is selected per document family rather than hard-coded. The
/// caller picks the profile explicitly; nothing is inferred from the text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum CatalogProfile {
    #[schemars(
        description = "The compact ten-line vocabulary used by summary statements (turnover, cost of sales, headline expenses, profit)."
    )]
    Summary,

    #[schemars(
        description = "The full restaurant income statement vocabulary: turnover block, cost-of-sales breakdown, other income and the detailed expense lines."
    )]
    Detailed,

    #[schemars(
        description = "Caller-supplied field definitions, validated identically to the built-in profiles."
    )]
    Custom(Vec<FieldDefinition>),
}

impl CatalogProfile {
    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(CatalogProfile)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&Self::generate_json_schema())
    }
}

/// Normal form used for every name comparison: lowercase, commas dropped,
/// internal whitespace collapsed. This is what makes
/// "Printing, stationery and menus" and "Printing stationery and menus"
/// resolve to the same field.
pub(crate) fn normalize_key(token: &str) -> String {
    let lowered = token.to_lowercase().replace(',', " ");
    lowered.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The validated, immutable field vocabulary consulted by the extractor.
///
/// Built once per run from a [`CatalogProfile`]; construction fails fast if
/// the profile contradicts itself (duplicate canonical names, or one alias
/// claimed by two fields) so a self-contradictory field list can never reach
/// extraction.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    fields: Vec<FieldDefinition>,
    index: HashMap<String, usize>,
}

impl FieldCatalog {
    pub fn from_profile(profile: &CatalogProfile) -> Result<Self> {
        let fields = match profile {
            CatalogProfile::Summary => summary_fields(),
            CatalogProfile::Detailed => detailed_fields(),
            CatalogProfile::Custom(fields) => fields.clone(),
        };
        Self::from_definitions(fields)
    }

    pub fn from_definitions(fields: Vec<FieldDefinition>) -> Result<Self> {
        if fields.is_empty() {
            return Err(StatementError::EmptyCatalog);
        }

        let mut index: HashMap<String, usize> = HashMap::new();

        for (position, field) in fields.iter().enumerate() {
            let key = normalize_key(&field.canonical_name);
            if key.is_empty() {
                return Err(StatementError::EmptyFieldName);
            }
            if index.contains_key(&key) {
                return Err(StatementError::DuplicateField(field.canonical_name.clone()));
            }
            index.insert(key, position);
        }

        for (position, field) in fields.iter().enumerate() {
            for alias in &field.aliases {
                let key = normalize_key(alias);
                if key.is_empty() {
                    return Err(StatementError::EmptyFieldName);
                }
                match index.get(&key) {
                    // An alias repeating its own field (including its own
                    // canonical name) is harmless.
                    Some(&existing) if existing == position => {}
                    Some(&existing) => {
                        return Err(StatementError::AliasCollision {
                            alias: alias.clone(),
                            first: fields[existing].canonical_name.clone(),
                            second: field.canonical_name.clone(),
                        });
                    }
                    None => {
                        index.insert(key, position);
                    }
                }
            }
        }

        Ok(Self { fields, index })
    }

    /// Resolves any search term (canonical name or alias, in any casing or
    /// spacing) to its canonical name.
    pub fn lookup(&self, token: &str) -> Option<&str> {
        self.index
            .get(&normalize_key(token))
            .map(|&position| self.fields[position].canonical_name.as_str())
    }

    /// Definitions in catalog order. `missing` and `ambiguous` reporting
    /// follows this order.
    pub fn fields(&self) -> &[FieldDefinition] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn canonical_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.canonical_name.as_str())
    }
}

/// The ten-line vocabulary of the compact statement revisions.
fn summary_fields() -> Vec<FieldDefinition> {
    vec![
        FieldDefinition::new("Gross turnover").with_alias("Total turnover"),
        FieldDefinition::new("Less VAT").with_alias("Less: VAT"),
        FieldDefinition::new("Nett turnover").with_alias("Net turnover"),
        FieldDefinition::new("Total cost of sales").with_alias("Cost of sales"),
        FieldDefinition::new("Beverages"),
        FieldDefinition::new("Staff wages").with_alias("Salaries and wages"),
        FieldDefinition::new("Utilities").with_alias("Electricity and water"),
        FieldDefinition::new("Marketing").with_alias("Advertising and marketing"),
        FieldDefinition::new("Gross profit"),
        FieldDefinition::new("Net profit/(loss)")
            .with_alias("Nett profit/(loss)")
            .with_alias("Net profit (loss)")
            .signed(),
    ]
}

/// The full income statement vocabulary observed across the detailed
/// statement revisions. Aliases carry the spelling drift between revisions
/// ("Nett"/"Net", "commission"/"commission paid", hyphenation of compounds).
fn detailed_fields() -> Vec<FieldDefinition> {
    vec![
        // Turnover block
        FieldDefinition::new("Gross turnover").with_alias("Total turnover"),
        FieldDefinition::new("Less VAT").with_alias("Less: VAT"),
        FieldDefinition::new("Nett turnover").with_alias("Net turnover"),
        FieldDefinition::new("Total cost of sales").with_alias("Cost of sales"),
        FieldDefinition::new("Gross profit"),
        // Cost of sales breakdown
        FieldDefinition::new("Beverages").with_alias("Beverage cost"),
        FieldDefinition::new("Bread and rolls"),
        FieldDefinition::new("Butter and cheese"),
        FieldDefinition::new("Chicken").with_alias("Chicken and poultry"),
        FieldDefinition::new("Chips"),
        FieldDefinition::new("Dairy").with_alias("Dairy products"),
        FieldDefinition::new("Desserts"),
        FieldDefinition::new("Fish").with_alias("Fish and seafood"),
        FieldDefinition::new("Groceries"),
        FieldDefinition::new("Ice cream").with_alias("Ice-cream"),
        FieldDefinition::new("Liquor").with_alias("Liquor cost"),
        FieldDefinition::new("Meat"),
        FieldDefinition::new("Oil").with_alias("Cooking oil"),
        FieldDefinition::new("Ribs"),
        FieldDefinition::new("Sauces").with_alias("Spur sauces"),
        FieldDefinition::new("Spices").with_alias("Spices and seasoning"),
        FieldDefinition::new("Vegetables").with_alias("Fresh produce"),
        // Other income
        FieldDefinition::new("Other income").with_alias("Sundry income"),
        FieldDefinition::new("Breakages recovered").with_alias("Breakages recovery"),
        FieldDefinition::new("Interest received"),
        FieldDefinition::new("Staff meals recovered"),
        // Expenses
        FieldDefinition::new("Total expenses").with_alias("Total operating expenses"),
        FieldDefinition::new("Accounting fees").with_alias("Accounting and audit fees"),
        FieldDefinition::new("Advertising and marketing")
            .with_alias("Marketing")
            .with_alias("Marketing general"),
        FieldDefinition::new("Bank charges"),
        FieldDefinition::new("Cleaning and pest control").with_alias("Cleaning expenses"),
        FieldDefinition::new("Computer expenses"),
        FieldDefinition::new("Credit card commission").with_alias("Credit card commission paid"),
        FieldDefinition::new("Delivery expenses"),
        FieldDefinition::new("Depreciation"),
        FieldDefinition::new("Donations"),
        FieldDefinition::new("Electricity").with_alias("Electricity and gas"),
        FieldDefinition::new("Entertainment").with_alias("Music and entertainment"),
        FieldDefinition::new("Equipment hire").with_alias("Hire of equipment"),
        FieldDefinition::new("Franchise fees").with_alias("Spur franchise fee"),
        FieldDefinition::new("Insurance").with_alias("Insurance and licences"),
        FieldDefinition::new("Interest paid"),
        FieldDefinition::new("Legal fees").with_alias("Legal and licence fees"),
        FieldDefinition::new("Motor vehicle expenses"),
        FieldDefinition::new("Packaging").with_alias("Packaging cost"),
        FieldDefinition::new("Printing, stationery and menus").with_alias("Printing and stationery"),
        FieldDefinition::new("Rent paid").with_alias("Rental"),
        FieldDefinition::new("Repairs and maintenance").with_alias("Repairs"),
        FieldDefinition::new("Royalties").with_alias("Royalty fees"),
        FieldDefinition::new("Salaries and wages")
            .with_alias("Staff wages")
            .with_alias("Wages"),
        FieldDefinition::new("Salaries and wages: management").with_alias("Management salaries"),
        FieldDefinition::new("Salaries and wages: production staff")
            .with_alias("Production staff wages"),
        FieldDefinition::new("Salaries and wages: waitrons").with_alias("Waitron wages"),
        FieldDefinition::new("Security").with_alias("Security expenses"),
        FieldDefinition::new("Staff meals"),
        FieldDefinition::new("Staff training"),
        FieldDefinition::new("Staff transport"),
        FieldDefinition::new("Staff uniforms").with_alias("Uniforms"),
        FieldDefinition::new("Telephone and internet").with_alias("Telephone expenses"),
        FieldDefinition::new("UIF and SDL contributions").with_alias("Company portion UIF and SDL"),
        FieldDefinition::new("Water and refuse").with_alias("Water and sewerage"),
        // Profit lines
        FieldDefinition::new("Operating profit")
            .with_alias("Operating profit/(loss)")
            .signed(),
        FieldDefinition::new("Net profit/(loss)")
            .with_alias("Nett profit/(loss)")
            .with_alias("Net profit (loss)")
            .with_alias("Net profit for the period")
            .signed(),
    ]
}
