use anyhow::Result;
use tracing::info;

use crate::batch::BatchOptions;
use crate::cli::PopulateArgs;
use crate::engine::passes::{
    AssignIdsPass, DeriveLocatorsPass, EnrichPass, FallbackPass, GeneratePass, TranslatePass,
};
use crate::generation::ResponseDirGenerator;

use super::{BatchCommand, load_store_config, load_translator, open_store, run_batch};

// Generated content is merged first; ids, locators and translations are then
// re-derived so a populate run leaves records in the same shape as `enrich`.
pub fn run(args: PopulateArgs) -> Result<()> {
    let selection = args.selection.selection()?;
    let config = load_store_config(&args.store)?;
    let store = open_store(&args.store)?;
    let translator = load_translator(args.translations.as_deref())?;
    let generator = ResponseDirGenerator::new(&args.responses_dir);

    info!(
        store = %store.describe(),
        responses = %generator.root().display(),
        selection = ?selection,
        fields = ?args.fields,
        "populate requested"
    );

    let passes: Vec<Box<dyn EnrichPass + '_>> = vec![
        Box::new(GeneratePass::new(&generator, args.fields.groups())),
        Box::new(AssignIdsPass),
        Box::new(DeriveLocatorsPass::new(&config)),
        Box::new(TranslatePass::new(translator.as_ref())),
        Box::new(FallbackPass),
    ];

    run_batch(
        BatchCommand {
            command: "populate",
            store: store.as_ref(),
            config: &config,
            passes: &passes,
            options: BatchOptions {
                dry_run: args.dry_run,
                synthesize_missing: true,
            },
            report_path: args.report_path,
        },
        selection,
    )
}
