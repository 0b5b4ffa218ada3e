//! Fixed XML framing around entries and cells.

use quick_xml::escape::escape;

use crate::cell::format_datetime;
use crate::context::FeedContext;

const NS_DATA: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices";
const NS_METADATA: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/metadata";
const NS_ATOM: &str = "http://www.w3.org/2005/Atom";
const SCHEME: &str = "http://schemas.microsoft.com/ado/2007/08/dataservices/scheme";
const CATEGORY_TERM: &str = "odata-feed.sql";

pub(super) const ENTRY_CLOSE: &str = "
      </m:properties>
    </content>
  </entry>
";

pub(super) const FEED_CLOSE: &str = "</feed>\n";

pub(super) fn feed_open(context: &FeedContext) -> String {
    let config = context.config();
    let base_url = escape(config.base_url()).into_owned();
    let collection_url = escape(config.collection_url()).into_owned();
    let collection = escape(config.collection());
    let updated = format_datetime(&context.generated_at());
    let total = context.total_count();
    format!(
        r#"<?xml version="1.0" encoding="utf-8" standalone="yes"?>
<feed xml:base="{base_url}" xmlns:d="{NS_DATA}" xmlns:m="{NS_METADATA}" xmlns="{NS_ATOM}">
  <title type="text">{collection}</title>
  <id>{collection_url}</id>
  <updated>{updated}</updated>
  <m:count>{total}</m:count>
  <link rel="self" title="{collection}" href="{collection_url}" />
"#
    )
}

pub(super) fn entry_open(context: &FeedContext, rowid: i64) -> String {
    let collection_url = escape(context.config().collection_url()).into_owned();
    let updated = format_datetime(&context.generated_at());
    format!(
        r#"  <entry>
    <id>{collection_url}({rowid})</id>
    <title type="text"></title>
    <updated>{updated}</updated>
    <author><name /></author>
    <category term="{CATEGORY_TERM}" scheme="{SCHEME}" />
    <content type="application/xml">
      <m:properties>
        "#
    )
}

pub(super) fn next_link(context: &FeedContext, query: &str) -> String {
    let href = escape(format!("{}{query}", context.config().collection_url())).into_owned();
    format!("  <link rel=\"next\" href=\"{href}\" />\n")
}
