//! Topic category table used for category matching.
//!
//! Keywords are lower-case and matched by substring containment.

#[derive(Debug)]
pub struct Category {
    pub name: &'static str,
    pub keywords: &'static [&'static str],
}

impl Category {
    /// True if any keyword occurs in `lowered` (already lower-cased).
    pub fn matches(&self, lowered: &str) -> bool {
        self.keywords.iter().any(|k| lowered.contains(k))
    }
}

pub static CATEGORIES: &[Category] = &[
    Category { name: "coffee", keywords: &["coffee", "café", "cafe", "breeze"] },
    Category { name: "chinese", keywords: &["chinese", "dragon", "wok", "china"] },
    Category {
        name: "sri lankan",
        keywords: &["sri lankan", "ceylon", "spice", "srilankan", "sri"],
    },
    Category {
        name: "washroom",
        keywords: &["washroom", "toilet", "restroom", "bathroom", "loo", "wc"],
    },
    Category { name: "conference", keywords: &["conference", "hall", "meeting", "event"] },
    Category { name: "subway", keywords: &["subway", "metro", "train", "underground"] },
    Category { name: "parking", keywords: &["parking", "park", "car"] },
    Category { name: "food", keywords: &["food", "eat", "restaurant", "dining", "meal"] },
    Category { name: "shop", keywords: &["shop", "store", "shopping", "buy"] },
    Category { name: "atm", keywords: &["atm", "cash", "money", "bank"] },
    Category { name: "wifi", keywords: &["wifi", "wi-fi", "internet", "wireless"] },
    Category { name: "entrance", keywords: &["entrance", "entry", "door"] },
    Category { name: "information", keywords: &["information", "info", "help", "desk"] },
    Category { name: "supermarket", keywords: &["supermarket", "grocery", "groceries"] },
    Category {
        name: "entertainment",
        keywords: &["entertainment", "movie", "cinema", "arcade", "play"],
    },
    Category { name: "second floor", keywords: &["second floor", "2nd floor", "floor 2"] },
    Category { name: "third floor", keywords: &["third floor", "3rd floor", "floor 3"] },
    Category { name: "ground floor", keywords: &["ground floor", "first floor", "floor 1"] },
];

/// Categories whose keywords occur in the lower-cased query.
pub fn query_categories(lowered_query: &str) -> impl Iterator<Item = &'static Category> + '_ {
    CATEGORIES.iter().filter(move |c| c.matches(lowered_query))
}
