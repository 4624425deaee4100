use anyhow::Result;
use tracing::info;

use crate::batch::BatchOptions;
use crate::cli::{EnrichArgs, PassName};
use crate::config::EnrichConfig;
use crate::engine::passes::{
    AssignIdsPass, DeriveLocatorsPass, EnrichPass, FallbackPass, TranslatePass,
};
use crate::generation::Translator;

use super::{BatchCommand, load_store_config, load_translator, open_store, run_batch};

pub fn run(args: EnrichArgs) -> Result<()> {
    let selection = args.selection.selection()?;
    let config = load_store_config(&args.store)?;
    let store = open_store(&args.store)?;
    let translator = load_translator(args.translations.as_deref())?;

    let passes: Vec<Box<dyn EnrichPass + '_>> = args
        .passes
        .iter()
        .map(|pass| build_pass(*pass, &config, translator.as_ref()))
        .collect();

    info!(
        store = %store.describe(),
        selection = ?selection,
        passes = passes.len(),
        "enrich requested"
    );

    run_batch(
        BatchCommand {
            command: "enrich",
            store: store.as_ref(),
            config: &config,
            passes: &passes,
            options: BatchOptions {
                dry_run: args.dry_run,
                synthesize_missing: false,
            },
            report_path: args.report_path,
        },
        selection,
    )
}

fn build_pass<'a>(
    pass: PassName,
    config: &EnrichConfig,
    translator: &'a dyn Translator,
) -> Box<dyn EnrichPass + 'a> {
    match pass {
        PassName::AssignIds => Box::new(AssignIdsPass),
        PassName::DeriveLocators => Box::new(DeriveLocatorsPass::new(config)),
        PassName::Fallback => Box::new(FallbackPass),
        PassName::Translate => Box::new(TranslatePass::new(translator)),
    }
}
