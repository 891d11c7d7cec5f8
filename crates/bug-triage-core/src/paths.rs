//! Language, file type, and module inference from a source path.

/// Known extensions and the language each implies.
const EXTENSION_LANGUAGES: &[(&str, &str)] = &[
    (".py", "python"),
    (".pyw", "python"),
    (".pyx", "python"),
    (".java", "java"),
    (".class", "java"),
    (".jar", "java"),
    (".js", "javascript"),
    (".jsx", "javascript"),
    (".mjs", "javascript"),
    (".ts", "typescript"),
    (".tsx", "typescript"),
    (".c", "c"),
    (".h", "c"),
    (".cpp", "cpp"),
    (".cc", "cpp"),
    (".cxx", "cpp"),
    (".hpp", "cpp"),
    (".cs", "csharp"),
    (".go", "go"),
    (".rs", "rust"),
    (".rb", "ruby"),
    (".php", "php"),
    (".swift", "swift"),
    (".kt", "kotlin"),
    (".kts", "kotlin"),
    (".scala", "scala"),
    (".r", "r"),
    (".sh", "shell"),
    (".bash", "shell"),
    (".zsh", "shell"),
    (".ps1", "powershell"),
    (".psm1", "powershell"),
    (".html", "html"),
    (".htm", "html"),
    (".css", "css"),
    (".scss", "css"),
    (".sass", "css"),
    (".sql", "sql"),
    (".yaml", "yaml"),
    (".yml", "yaml"),
    (".json", "json"),
    (".xml", "xml"),
];

/// Ordered path fragments mapping to ownership modules. First match wins.
const MODULE_RULES: &[(&[&str], &str)] = &[
    (&["/auth", "\\auth"], "auth"),
    (&["/api", "\\api"], "api"),
    (&["/db", "/database"], "database"),
    (&["/ui", "/frontend"], "ui"),
    (&["/user"], "user"),
    (&["/payment"], "payment"),
];

/// Modules that routing rules can be keyed on.
const ROUTING_MODULES: &[&str] = &["auth", "api"];

/// Language and file type derived from a path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathInference {
    pub language: Option<String>,
    pub file_type: Option<String>,
}

/// Lower-cased extension of the last path segment, including the dot.
///
/// Handles both `/` and `\` separators; dotfiles such as `.env` have no
/// extension.
pub fn detect_file_type(file_path: &str) -> Option<String> {
    let lower = file_path.trim().to_lowercase();
    let name = lower.rsplit(['/', '\\']).next().unwrap_or("");
    match name.rfind('.') {
        Some(idx) if idx > 0 && idx + 1 < name.len() => Some(name[idx..].to_string()),
        _ => None,
    }
}

pub fn language_for_extension(ext: &str) -> Option<&'static str> {
    let ext = ext.trim().to_lowercase();
    let ext = if ext.starts_with('.') {
        ext
    } else {
        format!(".{}", ext)
    };
    EXTENSION_LANGUAGES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, lang)| *lang)
}

pub fn detect_language(file_path: &str) -> Option<&'static str> {
    detect_file_type(file_path).and_then(|ext| language_for_extension(&ext))
}

pub fn infer(file_path: &str) -> PathInference {
    PathInference {
        language: detect_language(file_path).map(str::to_string),
        file_type: detect_file_type(file_path),
    }
}

/// A pair is inconsistent only when the extension is known and implies a
/// different language. Missing values are always consistent.
pub fn is_consistent(language: Option<&str>, file_type: Option<&str>) -> bool {
    match (language, file_type) {
        (Some(lang), Some(ft)) => match language_for_extension(ft) {
            Some(expected) => expected.eq_ignore_ascii_case(lang.trim()),
            None => true,
        },
        _ => true,
    }
}

/// Fills a missing language or file type from the path, keeping any value
/// the reporter supplied.
pub fn resolve(
    file_path: Option<&str>,
    language: Option<&str>,
    file_type: Option<&str>,
) -> PathInference {
    let inferred = file_path.map(infer).unwrap_or_default();
    PathInference {
        language: language.map(str::to_string).or(inferred.language),
        file_type: file_type.map(str::to_string).or(inferred.file_type),
    }
}

/// Ownership module implied by a path, if any.
pub fn module_for_path(file_path: &str) -> Option<&'static str> {
    let lower = file_path.to_lowercase();
    MODULE_RULES
        .iter()
        .find(|(fragments, _)| fragments.iter().any(|f| lower.contains(f)))
        .map(|(_, module)| *module)
}

/// Module usable as a routing-rule condition (`auth` or `api` only).
pub fn routing_module_for_path(file_path: &str) -> Option<&'static str> {
    module_for_path(file_path).filter(|m| ROUTING_MODULES.contains(m))
}
