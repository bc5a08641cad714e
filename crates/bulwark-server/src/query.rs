use http::Uri;
use http::uri::PathAndQuery;
use url::form_urlencoded;

/// Decode a query string into ordered name/value pairs
pub fn parse(query: &str) -> Vec<(String, String)> {
    form_urlencoded::parse(query.as_bytes())
        .map(|(name, value)| (name.into_owned(), value.into_owned()))
        .collect()
}

/// Encode name/value pairs back into a query string
pub fn serialize<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish()
}

/// Copy of `uri` with its query replaced; an empty query is removed
pub fn with_query(uri: &Uri, query: &str) -> Option<Uri> {
    let path_and_query = if query.is_empty() {
        PathAndQuery::try_from(uri.path()).ok()?
    } else {
        PathAndQuery::try_from(format!("{}?{query}", uri.path())).ok()?
    };

    let mut parts = uri.clone().into_parts();
    parts.path_and_query = Some(path_and_query);
    Uri::from_parts(parts).ok()
}
