//! Array index and buffer size checks

use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::library::MinSize;
use crate::features::symbol_db::{call_arguments, callee_name, Variable};
use crate::features::tokenizer::domain::string_literal_value;
use crate::features::tokenizer::TokenList;
use crate::features::value_flow::domain::{Bound, Value};
use crate::shared::models::{Severity, TokenId};

pub struct BufferOverrun;

fn array_text(var: &Variable) -> String {
    let dims: String = var
        .dimensions
        .iter()
        .map(|d| match d.size {
            Some(n) => format!("[{}]", n),
            None => "[]".to_string(),
        })
        .collect();
    format!("{}{}", var.name, dims)
}

fn index_message(array: &str, index: i64) -> String {
    format!(
        "$symbol:{}\nArray '{}' accessed at index {}, which is out of bounds.",
        array.split('[').next().unwrap_or(array),
        array,
        index
    )
}

fn index_cond_message(condition: &str, array: &str, index: i64) -> String {
    format!(
        "$symbol:{}\nEither the condition '{}' is redundant or the array '{}' is accessed at index {}, which is out of bounds.",
        array.split('[').next().unwrap_or(array),
        condition,
        array,
        index
    )
}

fn buffer_message(name: &str) -> String {
    format!("$symbol:{}\nBuffer is accessed out of bounds: $symbol", name)
}

/// Array variable token and dimension indexed by the subscript `open`
fn subscripted(list: &TokenList, open: TokenId) -> Option<(TokenId, usize)> {
    let mut depth = 0;
    let mut base = list[open].ast_op1?;
    while list.text(base) == "[" {
        depth += 1;
        base = list[base].ast_op1?;
    }
    (list[base].var_id != 0).then_some((base, depth))
}

fn out_of_bounds(value: &Value, size: i64) -> bool {
    let Some(index) = value.int_value() else {
        return false;
    };
    match value.bound {
        Bound::Point => index >= size || index < 0,
        Bound::Lower => index >= size,
        Bound::Upper => index < 0,
    }
}

impl BufferOverrun {
    fn array_indexes(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        for open in list.iter().filter(|&t| list.text(t) == "[") {
            let Some(index_tok) = list[open].ast_op2 else { continue };
            let Some((var_tok, dim)) = subscripted(list, open) else { continue };
            let Some(var) = ctx.db.variable_of(list, var_tok) else { continue };
            if !var.is_array() || var.name_token == Some(var_tok) || var.is_argument() {
                continue;
            }
            let Some(size) = var.dimensions.get(dim).and_then(|d| d.size) else { continue };

            // `&a[size]` points one past the end
            let outermost = list[open].ast_parent.map_or(true, |p| list.text(p) != "[");
            let address_of_end = outermost
                && list[open].ast_parent.is_some_and(|p| list.is_unary_op(p, "&"))
                && var.dimensions.len() == dim + 1;

            let values = &list[index_tok].values;
            let bad = |v: &&Value| {
                let limit = if address_of_end { size + 1 } else { size };
                !v.is_impossible() && out_of_bounds(v, limit)
            };
            let hit = values
                .iter()
                .filter(bad)
                .find(|v| v.is_known() || (v.is_possible() && v.condition.is_none()))
                .or_else(|| values.iter().filter(bad).find(|v| v.is_possible()));
            let Some(value) = hit else { continue };
            let Some(index) = value.int_value() else { continue };

            let array = array_text(var);
            let diagnostic = match value.condition.filter(|_| !value.is_known()) {
                Some(cond) => Diagnostic::new(
                    "arrayIndexOutOfBoundsCond",
                    Severity::Warning,
                    index_cond_message(&list.expression_string(cond), &array, index),
                ),
                None => Diagnostic::new("arrayIndexOutOfBounds", Severity::Error, index_message(&array, index)),
            };
            reporter.report(diagnostic.with_value(value).at(open).cwe(cwe::OUT_OF_BOUNDS));
        }
    }

    /// Bytes the library requires of a buffer argument
    fn required_size(ctx: &CheckContext<'_>, args: &[TokenId], min: MinSize) -> Option<i64> {
        let list = ctx.list;
        match min {
            MinSize::Bytes(n) => Some(n),
            MinSize::ArgValue(j) => {
                let arg = *args.get(j.checked_sub(1)?)?;
                list[arg].known_int()
            }
            MinSize::StrLen(j) => {
                let arg = *args.get(j.checked_sub(1)?)?;
                let text = string_literal_value(list.text(arg))?;
                Some(text.len() as i64 + 1)
            }
        }
    }

    fn buffer_size(ctx: &CheckContext<'_>, var: &Variable) -> Option<i64> {
        let mut element = var.value_type.clone()?;
        element.pointer = var.pointer_depth;
        let bytes = i64::from(element.size_of(&ctx.platform)?);
        var.dimensions
            .iter()
            .try_fold(bytes, |acc, d| d.size.map(|n| acc * n))
    }

    fn library_buffers(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        for call in list.iter() {
            let Some(name_tok) = callee_name(list, call) else { continue };
            let name = list.text(name_tok);
            let args = call_arguments(list, call);
            for (index, &arg) in args.iter().enumerate() {
                let Some(min) = ctx.library.min_size(name, index + 1) else { continue };
                let Some(var) = ctx.db.variable_of(list, arg).filter(|v| v.is_array()) else {
                    continue;
                };
                let (Some(required), Some(available)) =
                    (Self::required_size(ctx, &args, min), Self::buffer_size(ctx, var))
                else {
                    continue;
                };
                if required > available {
                    reporter.report(
                        Diagnostic::new("bufferAccessOutOfBounds", Severity::Error, buffer_message(&var.name))
                            .at(arg)
                            .cwe(cwe::OUT_OF_BOUNDS),
                    );
                }
            }
        }
    }
}

impl Check for BufferOverrun {
    fn name(&self) -> &'static str {
        "BufferOverrun"
    }

    fn class_info(&self) -> &'static str {
        "Out of bounds checking\n\
         - array index out of bounds\n\
         - buffer overflow in library calls"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        self.array_indexes(ctx, reporter);
        self.library_buffers(ctx, reporter);
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        let cwe = cwe::OUT_OF_BOUNDS;
        reporter.report(Diagnostic::new("arrayIndexOutOfBounds", Severity::Error, index_message("array[2]", 2)).cwe(cwe));
        reporter.report(
            Diagnostic::new(
                "arrayIndexOutOfBoundsCond",
                Severity::Warning,
                index_cond_message("x==2", "array[2]", 2),
            )
            .cwe(cwe),
        );
        reporter.report(Diagnostic::new("bufferAccessOutOfBounds", Severity::Error, buffer_message("buffer")).cwe(cwe));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::checks::infrastructure::testing::{check_code, messages};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_constant_index() {
        let logger = check_code(&BufferOverrun, "void f() { int a[10]; a[10] = 0; a[9] = 0; }");
        assert_eq!(
            messages(&logger, "arrayIndexOutOfBounds"),
            vec!["Array 'a[10]' accessed at index 10, which is out of bounds."]
        );
        assert_eq!(logger.errors[0].cwe, Some(788));
    }

    #[test]
    fn test_loop_past_end() {
        let logger = check_code(&BufferOverrun, "void f() { int a[10]; for (int i = 0; i <= 10; i++) { a[i] = 0; } }");
        assert_eq!(
            messages(&logger, "arrayIndexOutOfBounds"),
            vec!["Array 'a[10]' accessed at index 10, which is out of bounds."]
        );
    }

    #[test]
    fn test_loop_within_bounds() {
        let logger = check_code(&BufferOverrun, "void f() { int a[10]; for (int i = 0; i < 10; i++) { a[i] = 0; } }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn test_address_one_past_end() {
        let logger = check_code(&BufferOverrun, "int *f() { static int a[10]; return &a[10]; }");
        assert!(logger.errors.is_empty());
    }

    #[test]
    fn test_multi_dimensional() {
        let logger = check_code(&BufferOverrun, "void f() { int a[2][3]; a[1][3] = 0; a[1][2] = 0; }");
        assert_eq!(
            messages(&logger, "arrayIndexOutOfBounds"),
            vec!["Array 'a[2][3]' accessed at index 3, which is out of bounds."]
        );
    }

    #[test]
    fn test_redundant_condition() {
        let logger = check_code(&BufferOverrun, "void f(int i) { int a[10]; a[i] = 0; if (i == 10) { } }");
        assert_eq!(
            messages(&logger, "arrayIndexOutOfBoundsCond"),
            vec!["Either the condition 'i==10' is redundant or the array 'a[10]' is accessed at index 10, which is out of bounds."]
        );
        assert_eq!(logger.errors[0].severity, Severity::Warning);
    }

    #[test]
    fn test_library_buffer_size() {
        let logger = check_code(
            &BufferOverrun,
            "void f(const char *s) { char buf[4]; strcpy(buf, \"hello\"); memset(buf, 0, 4); }",
        );
        assert_eq!(messages(&logger, "bufferAccessOutOfBounds"), vec!["Buffer is accessed out of bounds: buf"]);
    }
}
