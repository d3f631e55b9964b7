//! # CLI Command Implementations

use super::Cli;
use customprops::{AppError, SchemaConfig, Session, set_input};
use customprops_core::{OwnerRef, PropertyContainer, PropertyPolicy, definition_checksum};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;

// =============================================================================
// CONTEXT
// =============================================================================

/// What every command needs: the resolved schema and output settings.
#[derive(Debug)]
pub struct Context {
    policy: Arc<dyn PropertyPolicy>,
    definition: PathBuf,
    json_mode: bool,
    quiet: bool,
}

impl Context {
    /// Load the schema and open its store.
    pub fn new(cli: &Cli) -> Result<Self, AppError> {
        let schema = SchemaConfig::load(&cli.schema)?;
        let store = schema.open_store()?;
        let registry = schema.build_registry(&store);
        tracing::debug!(
            schema = %cli.schema.display(),
            registered = registry.len(),
            mandatory = schema.mandatory.len(),
            "schema loaded"
        );

        Ok(Self {
            policy: Arc::new(registry),
            definition: cli.definition.clone(),
            json_mode: cli.json_mode,
            quiet: cli.quiet,
        })
    }

    fn open(&self) -> Result<Session, AppError> {
        let owner = OwnerRef::new(self.definition.clone());
        Session::open(&self.definition, Arc::clone(&self.policy), Some(owner))
    }

    fn note(&self, message: &str) {
        if !self.quiet && !self.json_mode {
            println!("{message}");
        }
    }
}

fn print_json(value: &Value) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Print the errors of every promoted property; returns how many failed.
fn report_errors(ctx: &Context, container: &PropertyContainer) -> usize {
    let errors = container.errors();
    if ctx.json_mode {
        print_json(&serde_json::json!({ "valid": errors.is_empty(), "errors": errors }));
        return errors.len();
    }
    for (sid, attributes) in &errors {
        for (attribute, messages) in attributes {
            for message in messages {
                println!("{sid}.{attribute}: {message}");
            }
        }
    }
    errors.len()
}

// =============================================================================
// SIDS COMMAND
// =============================================================================

/// List defined sids, then mandatory sids that are not defined.
pub fn cmd_sids(ctx: &Context) -> Result<(), AppError> {
    let session = ctx.open()?;
    let container = session.container();
    let sids = container.sids();

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "definition": session.path().to_string_lossy(),
            "sids": sids,
        }));
        return Ok(());
    }

    if sids.is_empty() {
        ctx.note("No properties defined");
    }
    for sid in &sids {
        if container.entry(sid).is_some() {
            println!("{sid}");
        } else {
            println!("{sid} (mandatory, undefined)");
        }
    }
    Ok(())
}

// =============================================================================
// SHOW COMMAND
// =============================================================================

/// Print the definition as the container serializes it.
pub fn cmd_show(ctx: &Context) -> Result<(), AppError> {
    let session = ctx.open()?;
    let text = serde_json::to_string_pretty(session.container()).map_err(|source| {
        AppError::Json {
            path: session.path().to_path_buf(),
            source,
        }
    })?;
    println!("{text}");
    Ok(())
}

// =============================================================================
// SET COMMAND
// =============================================================================

/// Promote `sid`, assign, save and write the definition back.
pub fn cmd_set(
    ctx: &Context,
    sid: &str,
    value: &str,
    trusted: bool,
    attrs: &[String],
) -> Result<(), AppError> {
    let input = set_input(value, attrs)?;

    let mut session = ctx.open()?;
    let container = session.container_mut();
    let skipped = container.set(sid, input, trusted)?;
    if !skipped.is_empty() {
        tracing::warn!(sid, ?skipped, "attributes not assignable, ignored");
    }

    if !container.property(sid)?.save(true) {
        report_errors(ctx, container);
        return Err(AppError::Invalid(1));
    }

    let written = session.commit()?;
    if ctx.json_mode {
        print_json(&serde_json::json!({
            "sid": sid,
            "saved": true,
            "written": written,
            "skipped": skipped,
        }));
    } else if written {
        ctx.note(&format!("Saved '{sid}' to {}", session.path().display()));
    } else {
        ctx.note(&format!("'{sid}' unchanged"));
    }
    Ok(())
}

// =============================================================================
// LOAD COMMAND
// =============================================================================

/// Bulk load form data, save every promoted property and write back.
///
/// Nothing is written unless every save succeeded.
pub fn cmd_load(ctx: &Context, input: &Path, scope: &str) -> Result<(), AppError> {
    let data: Value = customprops::read_json(input)?;

    let mut session = ctx.open()?;
    let container = session.container_mut();
    if !container.load(&data, Some(scope))? {
        ctx.note(&format!("No '{scope}' data in {}", input.display()));
        return Ok(());
    }

    if !container.save_all() {
        let failed = report_errors(ctx, container);
        return Err(AppError::Invalid(failed));
    }

    let loaded = container.promoted().count();
    let written = session.commit()?;
    if ctx.json_mode {
        print_json(&serde_json::json!({
            "scope": scope,
            "loaded": loaded,
            "written": written,
        }));
    } else {
        ctx.note(&format!(
            "Loaded {loaded} propert(y/ies) from {}",
            input.display()
        ));
    }
    Ok(())
}

// =============================================================================
// VALIDATE COMMAND
// =============================================================================

/// Promote and validate every defined and mandatory sid.
pub fn cmd_validate(ctx: &Context) -> Result<(), AppError> {
    let mut session = ctx.open()?;
    let container = session.container_mut();
    for sid in container.sids() {
        container.property(&sid)?;
    }

    let valid = container.validate();
    let failed = report_errors(ctx, container);
    if !valid {
        return Err(AppError::Invalid(failed));
    }
    ctx.note(&format!("{} propert(y/ies) valid", container.sids().len()));
    Ok(())
}

// =============================================================================
// REPLACES COMMAND
// =============================================================================

/// Report whether `field` is superseded by the property set.
pub fn cmd_replaces(ctx: &Context, field: &str) -> Result<(), AppError> {
    let container = PropertyContainer::new(Arc::clone(&ctx.policy));
    let replaced = container.is_replacing(field);

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "field": field,
            "replaced": replaced,
            "replaced_fields": container.replaced_field_names(),
        }));
        return Ok(());
    }

    if replaced {
        println!("'{field}' is replaced by properties");
    } else {
        println!("'{field}' is not replaced");
    }
    Ok(())
}

// =============================================================================
// HASH COMMAND
// =============================================================================

/// Print the definition checksum (and BLAKE3 with `crypto-hash`).
pub fn cmd_hash(ctx: &Context) -> Result<(), AppError> {
    let session = ctx.open()?;
    let definition = session.container().definition()?;
    let checksum = definition_checksum(&definition)?;

    #[cfg(feature = "crypto-hash")]
    let blake3 = Some(customprops_core::definition_crypto_hash(&definition)?);
    #[cfg(not(feature = "crypto-hash"))]
    let blake3: Option<String> = None;

    if ctx.json_mode {
        print_json(&serde_json::json!({
            "entries": definition.len(),
            "checksum": format!("{checksum:016x}"),
            "blake3": blake3,
        }));
        return Ok(());
    }

    println!("Checksum: {checksum:016x}");
    if let Some(hash) = blake3 {
        println!("BLAKE3:   {hash}");
    }
    Ok(())
}
