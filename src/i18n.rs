use eyre::{Result, WrapErr};
use i18n_embed::{
    fluent::{fluent_language_loader, FluentLanguageLoader},
    DesktopLanguageRequester, LanguageLoader,
};
use once_cell::sync::OnceCell;
use rust_embed::RustEmbed;
use unic_langid::LanguageIdentifier;

#[macro_export]
macro_rules! fl {
    ($message_id:literal) => {{
        i18n_embed_fl::fl!($crate::i18n::loader(), $message_id)
    }};

    ($message_id:literal, $($args:expr),*) => {{
        i18n_embed_fl::fl!($crate::i18n::loader(), $message_id, $($args), *)
    }};
}

static I18N_LOADER: OnceCell<FluentLanguageLoader> = OnceCell::new();

#[derive(RustEmbed)]
#[folder = "i18n"]
struct Localizations;

/// Loads the message bundles for the desktop languages, falling back to en-US.
///
/// Called once from `main` so a broken bundle is reported as an error instead of a
/// panic on the first message. Later calls are no-ops.
pub fn init() -> Result<()> {
    I18N_LOADER
        .get_or_try_init(load_i18n)
        .wrap_err("Unable to load i18n strings")?;

    Ok(())
}

pub fn loader() -> &'static FluentLanguageLoader {
    I18N_LOADER.get_or_init(|| load_fallback().expect("embedded en-US bundle is valid"))
}

fn load_i18n() -> Result<FluentLanguageLoader> {
    let requested_languages = DesktopLanguageRequester::requested_languages();
    load(&requested_languages)
}

fn load_fallback() -> Result<FluentLanguageLoader> {
    load(&[])
}

fn load(requested: &[LanguageIdentifier]) -> Result<FluentLanguageLoader> {
    let language_loader: FluentLanguageLoader = fluent_language_loader!();
    let fallback_language: &[LanguageIdentifier] = &[language_loader.fallback_language().clone()];
    let languages: Vec<&LanguageIdentifier> = requested
        .iter()
        .chain(fallback_language.iter())
        .collect();

    language_loader.load_languages(&Localizations, &languages)?;

    // Paths and URLs are interpolated into messages; isolate marks would corrupt them
    // when the output is copied back into a shell.
    language_loader.set_use_isolating(false);

    Ok(language_loader)
}
