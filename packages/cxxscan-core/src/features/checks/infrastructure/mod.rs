//! Built-in checks

mod auto_variables;
mod buffer_overrun;
mod class;
mod condition;
mod io;
mod memory;
mod null_pointer;
mod other;
mod stl;
mod uninit_var;

pub use auto_variables::AutoVariables;
pub use buffer_overrun::BufferOverrun;
pub use class::ClassCheck;
pub use condition::ConditionCheck;
pub use io::IoCheck;
pub use memory::MemoryCheck;
pub use null_pointer::NullPointer;
pub use other::OtherCheck;
pub use stl::StlCheck;
pub use uninit_var::UninitVar;

#[cfg(test)]
pub(crate) mod testing {
    use crate::config::Settings;
    use crate::features::checks::ports::{Check, CheckContext, Reporter};
    use crate::features::ctu::FileSummary;
    use crate::features::library::Library;
    use crate::features::symbol_db::SymbolDatabase;
    use crate::features::tokenizer::Tokenizer;
    use crate::features::value_flow::ValueFlowEngine;
    use crate::shared::ports::CollectingLogger;

    pub fn check_code(check: &dyn Check, code: &str) -> CollectingLogger {
        check_with(check, code, &Settings::default()).0
    }

    /// Run one check over `code`; also returns its whole-program summary
    pub fn check_with(check: &dyn Check, code: &str, settings: &Settings) -> (CollectingLogger, Option<FileSummary>) {
        check_file(check, code, "test.cpp", settings)
    }

    pub fn check_file(
        check: &dyn Check,
        code: &str,
        file: &str,
        settings: &Settings,
    ) -> (CollectingLogger, Option<FileSummary>) {
        let mut list = Tokenizer::new(settings).tokenize_str(code, file).unwrap().list;
        let library = Library::standard().unwrap();
        let db = SymbolDatabase::build(&mut list, settings, &library);
        ValueFlowEngine::new().run(&mut list, &db, settings, &library);

        let ctx = CheckContext::new(&list, &db, settings, &library, file);
        let mut logger = CollectingLogger::new();
        {
            let mut reporter = Reporter::new(&list, settings, file, &mut logger);
            check.run_checks(&ctx, &mut reporter);
        }
        (logger, check.get_file_info(&ctx))
    }

    /// Summarize every `(file, code)` and run the whole-program step
    pub fn check_program(check: &dyn Check, files: &[(&str, &str)]) -> CollectingLogger {
        let settings = Settings::default();
        let summaries: Vec<FileSummary> = files
            .iter()
            .filter_map(|(file, code)| check_file(check, code, file, &settings).1)
            .collect();
        let mut logger = CollectingLogger::new();
        {
            let mut reporter = Reporter::whole_program(&settings, &mut logger);
            check.analyse_whole_program(&summaries, &settings, &mut reporter);
        }
        logger
    }

    pub fn messages(logger: &CollectingLogger, id: &str) -> Vec<String> {
        logger.with_id(id).iter().map(|e| e.short_message.clone()).collect()
    }
}
