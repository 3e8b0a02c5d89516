use super::Source;
use crate::types::SourceType;

fn feed(name: &str, endpoint: &str, category: &str) -> Source {
    Source {
        name: name.to_string(),
        endpoint: endpoint.to_string(),
        enabled: true,
        source_type: SourceType::Rss,
        category: category.to_string(),
        language: "en".to_string(),
        api_key: None,
        options: serde_json::Map::new(),
    }
}

/// Built-in source list
pub fn default_sources() -> Vec<Source> {
    let mut gdelt_options = serde_json::Map::new();
    gdelt_options.insert("maxItems".into(), serde_json::json!(50));

    vec![
        feed("bbc-world", "https://feeds.bbci.co.uk/news/world/rss.xml", "world"),
        feed("npr-news", "https://feeds.npr.org/1001/rss.xml", "general"),
        feed("aljazeera", "https://www.aljazeera.com/xml/rss/all.xml", "world"),
        feed("guardian-world", "https://www.theguardian.com/world/rss", "world"),
        Source {
            name: "gdelt".to_string(),
            endpoint: "https://api.gdeltproject.org/api/v2/doc/doc?query=sourcelang:english&mode=artlist&maxrecords=50&format=json".to_string(),
            enabled: true,
            source_type: SourceType::Gdelt,
            category: "world".to_string(),
            language: "en".to_string(),
            api_key: None,
            options: gdelt_options,
        },
    ]
}
