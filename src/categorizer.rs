use serde::{Deserialize, Serialize};

pub const DEFAULT_CATEGORY: &str = "OTHERS";

/// Keyword rule: an item whose lower-cased name contains any keyword gets `category`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    pub category: String,
}

impl CategoryRule {
    pub fn new(keywords: &[&str], category: &str) -> Self {
        Self {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            category: category.to_string(),
        }
    }

    fn matches(&self, name_lower: &str) -> bool {
        self.keywords
            .iter()
            .any(|k| !k.is_empty() && name_lower.contains(k.as_str()))
    }
}

/// Rule table shipped with `posreport init`. Declaration order is evaluation
/// order: add-ons come first so "Pizza Extra Queso" lands in AGREGADO, and
/// soft drinks precede cocktails so "Ginger Ale" is not caught by "gin".
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(&["extra", "aderezo", "dip", "agr."], "AGREGADO"),
        CategoryRule::new(
            &[
                "pizza", "margherita", "pepperoni", "caprichosisima", "tartufo", "marinara",
                "putanesca", "fonduta", "brisket", "gambere", "rucula", "rúcula",
            ],
            "PIZZAS",
        ),
        CategoryRule::new(
            &["birra", "cerveza", "schop", "stella", "peroni", "leyenda", "estrella"],
            "CERVEZAS",
        ),
        CategoryRule::new(
            &[
                "coca", "fanta", "ginger", "tonica", "gaseosa", "agua", "vital", "jugo",
                "limonada",
            ],
            "AGUAS JUGOS & BEBIDAS",
        ),
        CategoryRule::new(
            &[
                "spritz", "negroni", "aperol", "campari", "sangria", "sangría", "frozen", "gin",
                "pisco", "fernet", "jack", "disaronno", "limoncello", "chambord", "mocktail",
            ],
            "COCTELERIA",
        ),
        CategoryRule::new(&["insalata", "ensalada"], "ENSALADAS"),
        CategoryRule::new(&["gnocchi", "ñoquis", "ñoqui"], "PASTAS"),
        CategoryRule::new(&["gelato", "tiramisú", "tiramisu", "affogato"], "POSTRES"),
        CategoryRule::new(
            &["espresso", "americano", "capuccino", "cafe", "café", "te ", "infusion"],
            "CAFETERIA",
        ),
        CategoryRule::new(
            &[
                "panetti", "panecillo", "tavola", "provolone", "burrata", "carpaccio",
                "croccantina",
            ],
            "ENTRADAS",
        ),
        CategoryRule::new(&["colacion"], "COLACIONES"),
        CategoryRule::new(&["combo", "felice", "promo"], "PROMOCIONES"),
    ]
}

/// First-match-wins keyword classifier. Ties between overlapping rules are
/// settled by declaration order only.
#[derive(Debug, Clone)]
pub struct Categorizer {
    rules: Vec<CategoryRule>,
    default_category: String,
}

impl Categorizer {
    pub fn new(rules: Vec<CategoryRule>, default_category: &str) -> Self {
        let rules = rules
            .into_iter()
            .map(|r| CategoryRule {
                keywords: r.keywords.iter().map(|k| k.to_lowercase()).collect(),
                category: r.category,
            })
            .collect();
        let default_category = if default_category.trim().is_empty() {
            DEFAULT_CATEGORY.to_string()
        } else {
            default_category.to_string()
        };
        Self {
            rules,
            default_category,
        }
    }

    pub fn categorize(&self, item_name: &str) -> &str {
        match self.matching_rule(item_name) {
            Some(idx) => &self.rules[idx].category,
            None => &self.default_category,
        }
    }

    /// Index of the rule that classifies `item_name`, if any.
    pub fn matching_rule(&self, item_name: &str) -> Option<usize> {
        let lower = item_name.to_lowercase();
        self.rules.iter().position(|r| r.matches(&lower))
    }

    pub fn rules(&self) -> &[CategoryRule] {
        &self.rules
    }

    pub fn default_category(&self) -> &str {
        &self.default_category
    }
}

impl Default for Categorizer {
    fn default() -> Self {
        Self::new(default_rules(), DEFAULT_CATEGORY)
    }
}
