//! Location encoding for a navigation collaborator (browser history, deep links).
//!
//! A location is `/a/b` for the context `["a", "b"]`, each value percent-encoded. A trailing `~`
//! means the context view is shown, and `?from=x/y` records the context the user came from. The
//! root context is `/`.

use serde::{Deserialize, Serialize};

use crate::{paths::Context, ThoughtError};

const CONTEXT_VIEW_MARKER: char = '~';
const FROM_PARAM: &str = "from=";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub context: Context,
    pub from: Option<Context>,
    pub show_contexts: bool,
}

fn encode_segments(context: &Context) -> String {
    context
        .normalize()
        .values()
        .iter()
        .map(|value| urlencoding::encode(value).replace(CONTEXT_VIEW_MARKER, "%7E"))
        .collect::<Vec<_>>()
        .join("/")
}

fn decode_segments(path: &str) -> Result<Context, ThoughtError> {
    let path = path.strip_prefix('/').unwrap_or(path);
    if path.is_empty() {
        return Ok(Context::root());
    }
    let values = path
        .split('/')
        .map(|segment| urlencoding::decode(segment).map(|value| value.into_owned()))
        .collect::<Result<Vec<String>, _>>()?;
    Ok(Context::from(values).normalize())
}

pub fn encode(context: &Context, from: Option<&Context>, show_contexts: bool) -> String {
    let mut location = format!("/{}", encode_segments(context));
    if show_contexts {
        location.push(CONTEXT_VIEW_MARKER);
    }
    if let Some(from) = from.filter(|from| !from.normalize().is_root()) {
        location.push('?');
        location.push_str(FROM_PARAM);
        location.push_str(&encode_segments(from));
    }
    location
}

pub fn decode(location: &str) -> Result<Location, ThoughtError> {
    let (path, query) = match location.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (location, None),
    };
    if !path.starts_with('/') {
        return Err(ThoughtError::Serialization(format!(
            "Location '{location}' does not start with '/'"
        )));
    }
    let (path, show_contexts) = match path.strip_suffix(CONTEXT_VIEW_MARKER) {
        Some(path) => (path, true),
        None => (path, false),
    };
    let from = query
        .and_then(|query| query.split('&').find_map(|pair| pair.strip_prefix(FROM_PARAM)))
        .map(decode_segments)
        .transpose()?;
    Ok(Location {
        context: decode_segments(path)?,
        from,
        show_contexts,
    })
}
