//! Class checks: non-virtual destructors of polymorphically deleted bases

use crate::features::checks::domain::{cwe, Diagnostic};
use crate::features::checks::ports::{Check, CheckContext, Reporter};
use crate::features::symbol_db::SymbolDatabase;
use crate::shared::models::{Severity, TypeId};
use std::collections::BTreeSet;

pub struct ClassCheck;

fn virtual_destructor_message(base: &str, derived: &str) -> String {
    format!(
        "$symbol:{}\nClass '$symbol' which is inherited by class '{}' does not have a virtual destructor.",
        base, derived
    )
}

/// Destructor of `ty` or of one of its bases is virtual
fn has_virtual_destructor(db: &SymbolDatabase, ty: TypeId) -> bool {
    std::iter::once(ty)
        .chain(db.all_bases(ty))
        .filter_map(|t| db.destructor_of(t))
        .any(|d| d.is_virtual())
}

impl Check for ClassCheck {
    fn name(&self) -> &'static str {
        "Class"
    }

    fn class_info(&self) -> &'static str {
        "Check the code for each class\n\
         - base classes deleted through a pointer without a virtual destructor"
    }

    fn run_checks(&self, ctx: &CheckContext<'_>, reporter: &mut Reporter<'_>) {
        let list = ctx.list;
        let db = ctx.db;

        // classes deleted through a pointer, in source order of their definition
        let mut deleted: BTreeSet<TypeId> = BTreeSet::new();
        for del in list.iter().filter(|&t| list.text(t) == "delete") {
            let Some(var) = list[del].ast_op1.and_then(|op| db.variable_of(list, op)) else {
                continue;
            };
            if !var.is_pointer() {
                continue;
            }
            if let Some(ty) = db.find_type(&var.type_name) {
                deleted.insert(ty.id);
            }
        }

        for base in deleted {
            let derived = db.derived_types(base);
            let Some(&first) = derived.first() else { continue };
            if has_virtual_destructor(db, base) {
                continue;
            }
            let info = db.type_info(base);
            reporter.report(
                Diagnostic::new(
                    "virtualDestructor",
                    Severity::Error,
                    virtual_destructor_message(&info.name, &db.type_info(first).name),
                )
                .at(info.class_def)
                .cwe(cwe::VIRTUAL_DTOR),
            );
        }
    }

    fn get_error_messages(&self, reporter: &mut Reporter<'_>) {
        reporter.report(
            Diagnostic::new(
                "virtualDestructor",
                Severity::Error,
                virtual_destructor_message("Base", "Derived"),
            )
            .cwe(cwe::VIRTUAL_DTOR),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::checks::infrastructure::testing::{check_code, messages};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_deleted_through_base_pointer() {
        let code = "class Base { public: ~Base() {} }; \
                    class Derived : public Base { public: ~Derived() {} }; \
                    void f(Base *b) { delete b; }";
        let logger = check_code(&ClassCheck, code);
        assert_eq!(
            messages(&logger, "virtualDestructor"),
            vec!["Class 'Base' which is inherited by class 'Derived' does not have a virtual destructor."]
        );
        assert_eq!(logger.errors[0].cwe, Some(404));
    }

    #[test]
    fn test_virtual_destructor_is_fine() {
        let code = "class Base { public: virtual ~Base() {} }; \
                    class Derived : public Base { }; \
                    void f(Base *b) { delete b; }";
        assert!(check_code(&ClassCheck, code).errors.is_empty());
    }

    #[test]
    fn test_without_delete_nothing_is_reported() {
        let code = "class Base { public: ~Base() {} }; class Derived : public Base { };";
        assert!(check_code(&ClassCheck, code).errors.is_empty());
    }
}
