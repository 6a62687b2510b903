use std::path::{Component, Path};
use uuid::Uuid;

pub const DEFAULT_EXTENSION: &str = ".png";

/// Last `.`-suffix of the uploaded name, dot included, taken verbatim.
pub fn extension_of(original_name: Option<&str>) -> &str {
    original_name
        .and_then(|name| name.rfind('.').map(|idx| &name[idx..]))
        .unwrap_or(DEFAULT_EXTENSION)
}

/// 32 hex characters followed by the extension of `original_name`.
pub fn generate_name(original_name: Option<&str>) -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        extension_of(original_name)
    )
}

/// True when `name` joined onto a directory names an entry directly inside it.
pub fn is_plain_file_name(name: &str) -> bool {
    let mut components = Path::new(name).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) && !name.contains(['/', '\\'])
}
