// build.rs

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

/// Picks the message catalog: a `lang_*` feature wins, then `ROBO_LANG`, then English.
fn effective_language() -> String {
    let mut from_features: Vec<String> = env::vars()
        .filter_map(|(key, _)| key.strip_prefix("CARGO_FEATURE_LANG_").map(str::to_lowercase))
        .collect();
    from_features.sort();

    if let Some(first) = from_features.first() {
        if from_features.len() > 1 {
            println!(
                "cargo:warning=Multiple language features enabled ({:?}). Using '{}'.",
                from_features, first
            );
        }
        return first.clone();
    }

    env::var("ROBO_LANG").unwrap_or_else(|_| "en".to_string())
}

fn read_catalog(path: &str) -> Option<BTreeMap<String, String>> {
    let content = fs::read_to_string(path).ok()?;
    Some(toml::from_str(&content).unwrap_or_else(|e| panic!("Failed to parse {}: {}", path, e)))
}

fn main() {
    let lang = effective_language();
    println!("cargo:rustc-env=ROBO_LANG_EFFECTIVE={}", lang);
    println!("cargo:rerun-if-env-changed=ROBO_LANG");
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-changed=locales/");

    // English is always complete; other catalogs only override what they translate.
    let mut messages =
        read_catalog("locales/en.toml").expect("Failed to read fallback catalog: locales/en.toml");
    if lang != "en" {
        let lang_path = format!("locales/{}.toml", lang);
        match read_catalog(&lang_path) {
            Some(specific) => messages.extend(specific),
            None => println!(
                "cargo:warning=Language file '{}' not found. Falling back to 'en'.",
                lang_path
            ),
        }
    }

    let mut macro_code = String::from("#[macro_export]\nmacro_rules! t {\n");
    for (key, value) in &messages {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        macro_code.push_str(&format!("    (\"{}\") => {{ \"{}\" }};\n", key, escaped));
    }
    macro_code.push_str(
        "    ($key:expr) => {{ compile_error!(concat!(\"Missing translation key: \", $key)) }};\n",
    );
    macro_code.push('}');

    let out_dir = env::var("OUT_DIR").expect("OUT_DIR is set by cargo");
    fs::write(Path::new(&out_dir).join("translations.rs"), macro_code)
        .expect("Failed to write translations.rs");
}
