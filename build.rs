// build.rs

// Compiles `locales/<lang>.toml` into a `t!` macro. English is always loaded
// first, so a partial translation falls back per key.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

const FALLBACK: &str = "en";

/// A `lang_*` feature wins over `WB_LANG`, which wins over English.
fn select_language() -> String {
    let mut features: Vec<String> = env::vars()
        .filter_map(|(key, _)| {
            key.strip_prefix("CARGO_FEATURE_LANG_")
                .map(str::to_lowercase)
        })
        .collect();
    features.sort();
    if let Some(first) = features.first() {
        if features.len() > 1 {
            println!(
                "cargo:warning=Several language features enabled ({:?}); using '{}'.",
                features, first
            );
        }
        return first.clone();
    }
    env::var("WB_LANG").unwrap_or_else(|_| FALLBACK.to_string())
}

fn load_table(path: &str) -> Option<BTreeMap<String, String>> {
    let content = fs::read_to_string(path).ok()?;
    let table = toml::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse {}: {}", path, e));
    Some(table)
}

fn render_macro(translations: &BTreeMap<String, String>) -> String {
    let mut code = String::from(
        "/// Expands to the message stored under a key.\n#[macro_export]\nmacro_rules! t {\n",
    );
    for (key, value) in translations {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        code.push_str(&format!("    (\"{}\") => {{ \"{}\" }};\n", key, escaped));
    }
    // Unknown keys fail the build.
    code.push_str(
        "    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n",
    );
    code.push('}');
    code
}

fn main() {
    let lang = select_language();
    println!("cargo:rustc-env=WB_LANG_EFFECTIVE={}", lang);
    println!("cargo:rerun-if-env-changed=WB_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    let fallback_path = format!("locales/{}.toml", FALLBACK);
    let mut translations = load_table(&fallback_path)
        .unwrap_or_else(|| panic!("Failed to read fallback language file: {}", fallback_path));

    if lang != FALLBACK {
        let lang_path = format!("locales/{}.toml", lang);
        match load_table(&lang_path) {
            Some(specific) => translations.extend(specific),
            None => println!(
                "cargo:warning=Language file '{}' not found. Falling back to '{}'.",
                lang_path, FALLBACK
            ),
        }
    }

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    let dest_path = Path::new(&out_dir).join("translations.rs");
    fs::write(&dest_path, render_macro(&translations)).expect("Failed to write translations.rs");
}
