use framecap_inject::InjectError;
use framecap_layer_lib::options::OptionsDecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("invalid capture options on the command line: {0}")]
    BadCaptureOptions(#[from] OptionsDecodeError),

    #[error("invalid environment arguments: {0}")]
    BadEnvArgs(String),

    #[error(transparent)]
    Inject(#[from] InjectError),
}

pub type Result<T> = std::result::Result<T, CliError>;
