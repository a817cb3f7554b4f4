use std::path::Path;

use ort::session::Session;

/// Preferred ONNX execution providers for the current platform.
///
/// An empty list means ONNX Runtime's default CPU provider. Providers that
/// fail to register at session creation fall back to CPU as well.
pub fn preferred_execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Builds an inference session for `model_path` on the preferred providers.
pub fn load_session(model_path: &Path) -> Result<Session, Box<dyn std::error::Error>> {
    let providers = preferred_execution_providers();
    log::debug!(
        "loading {} with {} platform execution provider(s)",
        model_path.display(),
        providers.len()
    );
    let session = Session::builder()?
        .with_execution_providers(providers)?
        .commit_from_file(model_path)?;
    Ok(session)
}
