//! Format string argument counts of printf/scanf style functions

use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::library::FormatKind;
use crate::features::symbol_db::{call_arguments, callee_name};
use crate::features::tokenizer::domain::string_literal_value;
use crate::shared::models::Severity;

pub struct IoCheck;

fn arg_num_message(function: &str, required: usize, given: usize) -> String {
    format!(
        "{} format string requires {} parameter{} but {}{} {} given.",
        function,
        required,
        if required == 1 { "" } else { "s" },
        if required > given { "only " } else { "" },
        given,
        if given == 1 { "is" } else { "are" }
    )
}

/// Arguments consumed by the conversions in `format`
pub(crate) fn required_arguments(format: &str, kind: FormatKind) -> usize {
    let mut chars = format.chars().peekable();
    let mut count = 0;
    while let Some(c) = chars.next() {
        if c != '%' {
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            continue;
        }
        let mut suppressed = false;
        // flags, width, precision, length
        while let Some(&c) = chars.peek() {
            match c {
                '*' if kind == FormatKind::Scanf => suppressed = true,
                '*' => count += 1,
                '-' | '+' | ' ' | '#' | '0'..='9' | '.' | '\'' => {}
                'h' | 'l' | 'L' | 'z' | 'j' | 't' | 'q' | 'I' => {}
                _ => break,
            }
            chars.next();
        }
        match chars.next() {
            Some('[') if kind == FormatKind::Scanf => {
                // `%[]abc]` keeps a leading `]` in the set
                if chars.peek() == Some(&']') {
                    chars.next();
                }
                for c in chars.by_ref() {
                    if c == ']' {
                        break;
                    }
                }
            }
            Some(_) => {}
            None => break,
        }
        if !suppressed {
            count += 1;
        }
    }
    count
}

impl Check for IoCheck {
    fn name(&self) -> &'static str {
        "IO"
    }

    fn class_info(&self) -> &'static str {
        "Check input/output operations\n\
         - wrong number of arguments given to printf/scanf style functions"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        for call in list.iter() {
            let Some(name_tok) = callee_name(list, call) else { continue };
            let name = list.text(name_tok);
            let Some((kind, format_arg)) = ctx.library.format_string(name) else { continue };
            let args = call_arguments(list, call);
            let Some(&format_tok) = format_arg.checked_sub(1).and_then(|i| args.get(i)) else {
                continue;
            };
            let Some(format) = string_literal_value(list.text(format_tok)) else { continue };

            let required = required_arguments(&format, kind);
            let given = args.len() - format_arg;
            if required == given {
                continue;
            }
            let severity = if required > given {
                Severity::Error
            } else {
                Severity::Warning
            };
            reporter.report(
                Diagnostic::new("wrongPrintfScanfArgNum", severity, arg_num_message(name, required, given))
                    .at(call)
                    .cwe(cwe::FORMAT_ARGS),
            );
        }
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        reporter.report(
            Diagnostic::new("wrongPrintfScanfArgNum", Severity::Error, arg_num_message("printf", 3, 2))
                .cwe(cwe::FORMAT_ARGS),
        );
    }
}
