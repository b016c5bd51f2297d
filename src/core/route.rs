//! Route keys exposed to the host.
//!
//! Keys have the form `<plugin-id>:<page>[:<argument>]`.

use thiserror::Error;

#[derive(Debug, Error)]
#[error("Unknown route: {0}")]
pub struct UnknownRoute(pub String);

/// A navigable page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Home page
    Start,

    /// All popular items
    Popular,

    /// File listing of one item
    Files(String),

    /// Search results; an empty query is the bare search entry
    Search(String),

    /// All favorites
    Favorites,
}

impl Route {
    /// Route key under a plugin id
    pub fn key(&self, plugin_id: &str) -> String {
        match self {
            Route::Start => format!("{}:start", plugin_id),
            Route::Popular => format!("{}:popular", plugin_id),
            Route::Files(identifier) => format!("{}:files:{}", plugin_id, identifier),
            Route::Search(query) => format!("{}:search:{}", plugin_id, query),
            Route::Favorites => format!("{}:favorites", plugin_id),
        }
    }

    /// Parse a route key; the argument is everything after the page name
    pub fn parse(plugin_id: &str, key: &str) -> Result<Self, UnknownRoute> {
        let unknown = || UnknownRoute(key.to_string());

        let rest = key
            .strip_prefix(plugin_id)
            .and_then(|r| r.strip_prefix(':'))
            .ok_or_else(unknown)?;

        match rest {
            "start" => Ok(Route::Start),
            "popular" => Ok(Route::Popular),
            "favorites" => Ok(Route::Favorites),
            _ => {
                if let Some(identifier) = rest.strip_prefix("files:") {
                    if identifier.is_empty() {
                        return Err(unknown());
                    }
                    Ok(Route::Files(identifier.to_string()))
                } else if let Some(query) = rest.strip_prefix("search:") {
                    Ok(Route::Search(query.to_string()))
                } else {
                    Err(unknown())
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "internetarchive";

    #[test]
    fn test_keys() {
        assert_eq!(Route::Start.key(ID), "internetarchive:start");
        assert_eq!(Route::Popular.key(ID), "internetarchive:popular");
        assert_eq!(
            Route::Files("notld".to_string()).key(ID),
            "internetarchive:files:notld"
        );
        assert_eq!(
            Route::Search(String::new()).key(ID),
            "internetarchive:search:"
        );
        assert_eq!(Route::Favorites.key(ID), "internetarchive:favorites");
    }

    #[test]
    fn test_parse() {
        assert_eq!(Route::parse(ID, "internetarchive:start").unwrap(), Route::Start);
        assert_eq!(
            Route::parse(ID, "internetarchive:files:a:b").unwrap(),
            Route::Files("a:b".to_string())
        );
        assert_eq!(
            Route::parse(ID, "internetarchive:search:title:(dead) AND year:1968").unwrap(),
            Route::Search("title:(dead) AND year:1968".to_string())
        );
        assert_eq!(
            Route::parse(ID, "internetarchive:search:").unwrap(),
            Route::Search(String::new())
        );
    }

    #[test]
    fn test_parse_rejects_unknown() {
        assert!(Route::parse(ID, "internetarchive:files:").is_err());
        assert!(Route::parse(ID, "internetarchive:nope").is_err());
        assert!(Route::parse(ID, "other:start").is_err());
        assert!(Route::parse(ID, "internetarchivestart").is_err());
    }
}
