use super::*;
use crate::types::SourceType;


pub(super) fn source(name: &str, endpoint: &str, source_type: SourceType) -> Source {
    Source {
        name: name.to_string(),
        endpoint: endpoint.to_string(),
        enabled: true,
        source_type,
        category: "world".to_string(),
        language: "en".to_string(),
        api_key: None,
        options: serde_json::Map::new(),
    }
}

pub(super) const RSS_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0" xmlns:content="http://purl.org/rss/1.0/modules/content/">
  <channel>
    <title>World</title>
    <link>https://news.test/</link>
    <description>World news</description>
    <item>
      <title>Summit opens &amp; leaders arrive</title>
      <link>https://news.test/summit</link>
      <description><![CDATA[<p>Leaders <b>arrive</b> in Berlin.</p>]]></description>
      <pubDate>Tue, 05 Mar 2024 14:30:00 GMT</pubDate>
      <category>politics</category>
      <category>europe</category>
    </item>
    <item>
      <title>Storm warning</title>
      <link>https://news.test/storm</link>
      <description>Heavy rain expected.</description>
      <pubDate>Mon, 04 Mar 2024 08:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

pub(super) const ATOM_FEED: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>Tech</title>
  <id>urn:uuid:feed</id>
  <updated>2024-03-05T10:00:00Z</updated>
  <entry>
    <title>Chip shortage eases</title>
    <id>urn:uuid:entry-1</id>
    <link rel="alternate" href="https://tech.test/chips"/>
    <updated>2024-03-05T10:00:00Z</updated>
    <published>2024-03-05T09:00:00Z</published>
    <summary>Supply recovers.</summary>
    <author><name>Ada</name></author>
  </entry>
</feed>"#;
