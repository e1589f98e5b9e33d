//! Configuration discovery and preprocessing of one source file

use crate::features::preprocessor::domain::{parse_configuration, parse_define, MacroDef};
use crate::features::preprocessor::infrastructure::{
    condition_names, evaluate, expand, MacroTable, PreprocessError, PreprocessResult,
};
use crate::features::tokenizer::{lex, RawToken};
use crate::shared::models::FileLocation;
use rustc_hash::FxHashSet;
use tracing::debug;

/// One logical source line
#[derive(Debug, Clone)]
struct Line {
    tokens: Vec<RawToken>,
}

impl Line {
    /// Directive name for `# name ...` lines
    fn directive(&self) -> Option<&str> {
        match self.tokens.as_slice() {
            [hash, name, ..] if hash.text == "#" && name.line == hash.line => Some(name.text.as_str()),
            [hash] if hash.text == "#" => Some(""),
            _ => None,
        }
    }

    /// Tokens after the directive name
    fn operands(&self) -> &[RawToken] {
        self.tokens.get(2..).unwrap_or(&[])
    }
}

/// State of one `#if` group while preprocessing
#[derive(Debug)]
struct Conditional {
    parent_active: bool,
    taken: bool,
    active: bool,
    location: FileLocation,
}

/// Lexed source file with its directives
#[derive(Debug, Clone)]
pub struct Preprocessor {
    file_name: String,
    lines: Vec<Line>,
    user_defines: Vec<(String, String)>,
}

impl Preprocessor {
    /// Lex `source` once; `user_defines` are `NAME` or `NAME=VALUE`
    pub fn new(source: &str, file_name: &str, user_defines: &[String]) -> PreprocessResult<Self> {
        let tokens = lex(source, 0, file_name)?;
        let mut lines: Vec<Line> = Vec::new();
        for tok in tokens {
            match lines.last_mut() {
                Some(line) if line.tokens.last().is_some_and(|t| t.logical_line == tok.logical_line) => {
                    line.tokens.push(tok);
                }
                _ => lines.push(Line { tokens: vec![tok] }),
            }
        }
        Ok(Self {
            file_name: file_name.to_string(),
            lines,
            user_defines: user_defines.iter().map(|d| parse_define(d)).collect(),
        })
    }

    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn files(&self) -> Vec<String> {
        vec![self.file_name.clone()]
    }

    fn location(&self, tok: &RawToken) -> FileLocation {
        FileLocation::new(self.file_name.clone(), tok.line, tok.column)
    }

    /// Name of the include guard macro, if the file has one
    fn include_guard(&self) -> Option<String> {
        let directives: Vec<&Line> = self.lines.iter().filter(|l| l.directive().is_some()).collect();
        let (first, second) = (directives.first()?, directives.get(1)?);
        if first.directive() != Some("ifndef") || second.directive() != Some("define") {
            return None;
        }
        let guard = first.operands().first()?;
        if second.operands().first().map(|t| t.text.as_str()) != Some(guard.text.as_str()) {
            return None;
        }
        // the guard's #endif must close the last group in the file
        let mut depth = 0usize;
        for (i, line) in directives.iter().enumerate() {
            match line.directive() {
                Some("if" | "ifdef" | "ifndef") => depth += 1,
                Some("endif") => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 && i + 1 != directives.len() {
                        return None;
                    }
                }
                _ => {}
            }
        }
        Some(guard.text.clone())
    }

    /// Preprocessor configurations of the file; the default configuration
    /// `""` comes first, the rest in order of appearance
    pub fn configurations(&self) -> Vec<String> {
        let mut excluded: FxHashSet<String> = self.user_defines.iter().map(|(n, _)| n.clone()).collect();
        excluded.extend(self.include_guard());

        let mut configs = vec![String::new()];
        let mut seen: FxHashSet<String> = FxHashSet::default();
        seen.insert(String::new());
        // names contributed by each open group
        let mut stack: Vec<Vec<String>> = Vec::new();

        let mut record = |stack: &[Vec<String>], extra: &[String], configs: &mut Vec<String>| {
            let mut names: Vec<&str> = Vec::new();
            for name in stack.iter().flatten().chain(extra) {
                if !names.contains(&name.as_str()) {
                    names.push(name);
                }
            }
            let cfg = names.join(";");
            if seen.insert(cfg.clone()) {
                configs.push(cfg);
            }
        };

        for line in &self.lines {
            let Some(directive) = line.directive() else {
                continue;
            };
            match directive {
                "define" => {
                    if let Some(name) = line.operands().first() {
                        excluded.insert(name.text.clone());
                    }
                }
                "ifdef" | "ifndef" => {
                    let names: Vec<String> = line
                        .operands()
                        .first()
                        .map(|t| t.text.clone())
                        .filter(|n| !excluded.contains(n))
                        .into_iter()
                        .collect();
                    if !names.is_empty() {
                        record(&stack, &names, &mut configs);
                    }
                    stack.push(names);
                }
                "if" | "elif" => {
                    if directive == "elif" {
                        stack.pop();
                    }
                    let mut names = condition_names(line.operands());
                    names.retain(|n| !excluded.contains(n));
                    names.dedup();
                    if names.is_empty() {
                        stack.push(Vec::new());
                    } else if line.operands().iter().any(|t| t.text == "||") {
                        for name in &names {
                            record(&stack, std::slice::from_ref(name), &mut configs);
                        }
                        stack.push(Vec::new());
                    } else {
                        record(&stack, &names, &mut configs);
                        stack.push(names);
                    }
                }
                "else" => {
                    if let Some(top) = stack.last_mut() {
                        top.clear();
                    }
                }
                "endif" => {
                    stack.pop();
                }
                _ => {}
            }
        }
        debug!(file = %self.file_name, count = configs.len(), "configurations collected");
        configs
    }

    /// Preprocess the file for one configuration
    pub fn preprocess(&self, cfg: &str) -> PreprocessResult<Vec<RawToken>> {
        let mut macros = MacroTable::default();
        for (name, value) in self.user_defines.iter().cloned().chain(parse_configuration(cfg)) {
            let body = lex(&value, 0, &self.file_name)?;
            macros.insert(name.clone(), MacroDef::object(name, body));
        }

        let mut out: Vec<RawToken> = Vec::new();
        let mut pending: Vec<RawToken> = Vec::new();
        let mut stack: Vec<Conditional> = Vec::new();

        for line in &self.lines {
            let active = stack.last().map_or(true, |c| c.active);
            let Some(directive) = line.directive() else {
                if active {
                    pending.extend(line.tokens.iter().cloned());
                }
                continue;
            };
            if !pending.is_empty() {
                out.extend(expand(&pending, &macros));
                pending.clear();
            }
            let location = self.location(&line.tokens[0]);
            match directive {
                "if" | "ifdef" | "ifndef" => {
                    let cond = active && self.condition(directive, line, &macros, &location)?;
                    stack.push(Conditional {
                        parent_active: active,
                        taken: cond,
                        active: cond,
                        location,
                    });
                }
                "elif" => {
                    let Some(top) = stack.last() else {
                        return Err(unbalanced("#elif without #if", location));
                    };
                    let cond = top.parent_active && !top.taken && evaluate(line.operands(), &macros, &location)?;
                    if let Some(top) = stack.last_mut() {
                        top.active = cond;
                        top.taken |= cond;
                    }
                }
                "else" => {
                    let Some(top) = stack.last_mut() else {
                        return Err(unbalanced("#else without #if", location));
                    };
                    top.active = top.parent_active && !top.taken;
                    top.taken = true;
                }
                "endif" => {
                    if stack.pop().is_none() {
                        return Err(unbalanced("#endif without #if", location));
                    }
                }
                _ if !active => {}
                "define" => {
                    if let Some(def) = parse_macro(line.operands()) {
                        macros.insert(def.name.clone(), def);
                    }
                }
                "undef" => {
                    if let Some(name) = line.operands().first() {
                        macros.remove(&name.text);
                    }
                }
                "error" => {
                    let message = line.operands().iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ");
                    return Err(PreprocessError::ErrorDirective { message, location });
                }
                // include, pragma, line, warning and unknown directives
                _ => {}
            }
        }
        if let Some(open) = stack.pop() {
            return Err(unbalanced("missing #endif", open.location));
        }
        out.extend(expand(&pending, &macros));
        Ok(out)
    }

    fn condition(&self, directive: &str, line: &Line, macros: &MacroTable, location: &FileLocation) -> PreprocessResult<bool> {
        match directive {
            "ifdef" | "ifndef" => {
                let Some(name) = line.operands().first() else {
                    return Err(PreprocessError::InvalidExpression {
                        message: format!("#{} without macro name", directive),
                        location: location.clone(),
                    });
                };
                Ok(macros.contains_key(&name.text) == (directive == "ifdef"))
            }
            _ => evaluate(line.operands(), macros, location),
        }
    }
}

fn unbalanced(message: &str, location: FileLocation) -> PreprocessError {
    PreprocessError::Unbalanced {
        message: message.to_string(),
        location,
    }
}

/// `NAME body` or `NAME(params) body`; the parameter list must follow the
/// name without whitespace
fn parse_macro(operands: &[RawToken]) -> Option<MacroDef> {
    let name = operands.first()?;
    let adjacent_paren = operands.get(1).is_some_and(|p| {
        p.text == "(" && p.line == name.line && p.column as usize == name.column as usize + name.text.chars().count()
    });
    if !adjacent_paren {
        return Some(MacroDef::object(name.text.clone(), operands[1..].to_vec()));
    }
    let close = operands.iter().position(|t| t.text == ")")?;
    let mut params = Vec::new();
    let mut variadic = false;
    for tok in &operands[2..close] {
        match tok.text.as_str() {
            "," => {}
            "..." => {
                variadic = true;
                params.push("__VA_ARGS__".to_string());
            }
            other => params.push(other.to_string()),
        }
    }
    Some(MacroDef {
        name: name.text.clone(),
        params: Some(params),
        variadic,
        body: operands[close + 1..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn pp(src: &str) -> Preprocessor {
        Preprocessor::new(src, "a.c", &[]).unwrap()
    }

    fn text(tokens: &[RawToken]) -> String {
        tokens.iter().map(|t| t.text.as_str()).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_configurations() {
        let src = "#ifdef A\nint a;\n#ifdef B\nint b;\n#endif\n#endif\n#if defined(C) || defined(D)\n#endif\n#ifdef A\n#endif\n";
        assert_eq!(pp(src).configurations(), vec!["", "A", "A;B", "C", "D"]);
    }

    #[test]
    fn test_configurations_exclusions() {
        let src = "#ifndef GUARD_H\n#define GUARD_H\n#define LOCAL\n#ifdef LOCAL\n#endif\n#ifdef USER\n#endif\n#if X && Y\n#endif\n#endif\n";
        let p = Preprocessor::new(src, "a.h", &["USER=3".to_string()]).unwrap();
        assert_eq!(p.configurations(), vec!["", "X;Y"]);
    }

    #[test]
    fn test_preprocess_selects_branches() {
        let src = "#ifdef A\nint a;\n#elif defined(B)\nint b;\n#else\nint c;\n#endif\n";
        let p = pp(src);
        assert_eq!(text(&p.preprocess("").unwrap()), "int c ;");
        assert_eq!(text(&p.preprocess("A").unwrap()), "int a ;");
        assert_eq!(text(&p.preprocess("B").unwrap()), "int b ;");
    }

    #[test]
    fn test_define_and_undef() {
        let src = "#define N 4\nint a[N];\n#undef N\nint b[N];\n#define SQ(x) ((x)*(x))\nint c = SQ(2);\n#define P (1)\nint d = P;\n";
        assert_eq!(
            text(&pp(src).preprocess("").unwrap()),
            "int a [ 4 ] ; int b [ N ] ; int c = ( ( 2 ) * ( 2 ) ) ; int d = ( 1 ) ;"
        );
    }

    #[test]
    fn test_error_directive_only_when_active() {
        let p = pp("#ifdef A\n#error \"A is not supported\"\n#endif\nint x;\n");
        assert_eq!(text(&p.preprocess("").unwrap()), "int x ;");
        let err = p.preprocess("A").unwrap_err();
        assert_eq!(err.diagnostic_id(), "preprocessorErrorDirective");
        assert_eq!(err.location().line, 2);
    }

    #[test]
    fn test_unbalanced() {
        assert!(matches!(pp("#endif\n").preprocess(""), Err(PreprocessError::Unbalanced { .. })));
        assert!(matches!(pp("#if 1\nint x;\n").preprocess(""), Err(PreprocessError::Unbalanced { .. })));
    }

    #[test]
    fn test_spliced_directive() {
        let p = pp("#define LONG 1 + \\\n 2\nint x = LONG;\n");
        assert_eq!(text(&p.preprocess("").unwrap()), "int x = 1 + 2 ;");
    }

    #[test]
    fn test_expanded_tokens_keep_use_site() {
        let p = pp("#define Z 0\nint f() {\n  return 1 / Z;\n}\n");
        let out = p.preprocess("").unwrap();
        let zero = out.iter().find(|t| t.text == "0").unwrap();
        assert_eq!(zero.line, 3);
        assert!(zero.flags.contains(crate::features::tokenizer::TokenFlags::EXPANDED_MACRO));
    }
}
