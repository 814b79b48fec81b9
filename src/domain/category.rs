// src/domain/category.rs

/// Keyword tables for category fallback, scored in order; ties go to the
/// earlier entry.
const CATEGORY_KEYWORDS: &[(&str, &[&str])] = &[
    (
        "Produce",
        &[
            "apple", "banana", "orange", "grape", "berry", "strawberry", "blueberry",
            "raspberry", "lettuce", "spinach", "kale", "carrot", "potato", "onion", "tomato",
            "cucumber", "pepper", "broccoli", "cauliflower", "celery", "avocado", "lemon",
            "lime", "peach", "pear", "plum", "cherry", "melon", "watermelon", "cabbage",
            "zucchini", "squash", "mushroom", "garlic", "ginger", "salad", "produce", "fruit",
            "vegetable", "veggie",
        ],
    ),
    (
        "Meat",
        &[
            "chicken", "beef", "pork", "turkey", "lamb", "fish", "salmon", "tuna", "ground",
            "steak", "roast", "chops", "wings", "thighs", "breast", "bacon", "ham", "sausage",
            "deli", "meat", "ribeye", "sirloin", "tenderloin", "brisket", "ribs", "drumstick",
        ],
    ),
    (
        "Dairy",
        &[
            "milk", "cheese", "yogurt", "butter", "cream", "cheddar", "mozzarella", "parmesan",
            "brie", "dairy", "lactose", "eggs", "egg",
        ],
    ),
    (
        "Bakery",
        &[
            "bread", "buns", "rolls", "bagels", "muffins", "croissant", "pastry", "cake",
            "cookies", "pie", "tart", "donut", "danish", "scone", "bakery", "baked",
            "sourdough", "baguette", "focaccia", "pretzel",
        ],
    ),
    (
        "Frozen",
        &[
            "frozen", "ice cream", "popsicle", "sorbet", "gelato",
        ],
    ),
    (
        "Pantry",
        &[
            "pasta", "rice", "beans", "lentils", "quinoa", "oats", "cereal", "flour", "sugar",
            "spices", "oil", "vinegar", "sauce", "dressing", "condiment", "canned", "jarred",
            "dried", "honey", "syrup", "jam", "jelly", "peanut butter",
        ],
    ),
    (
        "Snacks",
        &[
            "chips", "crackers", "popcorn", "pretzels", "nuts", "trail mix", "granola",
            "energy bar", "protein bar", "candy", "chocolate", "snack", "treats", "jerky",
        ],
    ),
    (
        "Beverages",
        &[
            "water", "juice", "soda", "pop", "coffee", "tea", "energy drink", "kombucha",
            "smoothie", "sparkling", "drink", "beverage",
        ],
    ),
];

/// Scores product name + description against the keyword tables and
/// returns the best-matching category, or "Other" when nothing matches.
pub fn detect_category(name: &str, description: Option<&str>) -> &'static str {
    let mut text = name.to_lowercase();
    if let Some(desc) = description {
        text.push(' ');
        text.push_str(&desc.to_lowercase());
    }

    let mut best: Option<(&'static str, usize)> = None;
    for (category, keywords) in CATEGORY_KEYWORDS {
        let score: usize = keywords.iter().map(|k| count_word_matches(&text, k)).sum();
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((category, score));
        }
    }

    best.map(|(category, _)| category).unwrap_or("Other")
}

/// Counts whole-word occurrences of `keyword` in `text` (both lowercase).
/// Partial matches like "grapefruit" for "grape" do not count.
fn count_word_matches(text: &str, keyword: &str) -> usize {
    let mut count = 0;
    let mut from = 0;

    while let Some(pos) = text[from..].find(keyword) {
        let start = from + pos;
        let end = start + keyword.len();

        let boundary_before = start == 0
            || !text[..start].chars().next_back().is_some_and(|c| c.is_alphanumeric());
        let boundary_after =
            end == text.len() || !text[end..].chars().next().is_some_and(|c| c.is_alphanumeric());

        if boundary_before && boundary_after {
            count += 1;
        }
        from = start + keyword.len().max(1);
    }

    count
}
