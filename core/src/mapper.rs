//! Parameter Mapper: folds the three parameter groups into one `ConvertRequest`.
//!
//! # Design
//! Each group has its own `apply_*` step that writes only the fields the
//! group owns and leaves every other field untouched. Because no two steps
//! share a field, the final request does not depend on how the steps are
//! composed; `merge` simply runs them in the order input, output, conversion.
//!
//! Normalization rules:
//! - input method and storage identifiers are lower-cased;
//! - `false` flags, empty strings and non-positive timeouts become absent;
//! - `DownloadMethod::Inline` becomes the literal `"inline"`, `True` becomes
//!   boolean `true`, `False` is omitted.

use crate::error::ConvertError;
use crate::types::{
    ConversionParameters, ConvertRequest, DownloadMethod, DownloadSelector, InputParameters,
    OutputParameters,
};

/// Merge the three parameter groups into a wire request.
///
/// Fails with `InvalidArgument` when the input or output format is blank.
pub fn merge(
    input: &InputParameters,
    output: &OutputParameters,
    conversion: &ConversionParameters,
) -> Result<ConvertRequest, ConvertError> {
    require("input_format", &input.input_format)?;
    require("output_format", &conversion.output_format)?;

    let mut request = ConvertRequest::default();
    apply_input(&mut request, input);
    apply_output(&mut request, output);
    apply_conversion(&mut request, conversion);
    Ok(request)
}

/// Write the fields owned by `InputParameters`.
pub fn apply_input(request: &mut ConvertRequest, input: &InputParameters) {
    request.input_format = non_empty(&input.input_format);
    request.input_method = non_empty(&input.input_method).map(|m| m.to_lowercase());
    request.file_path = input.file_path.as_deref().and_then(non_empty);
    request.file_name = input.file_name.as_deref().and_then(non_empty);
    request.tag = input.tag.as_deref().and_then(non_empty);
}

/// Write the fields owned by `OutputParameters`.
pub fn apply_output(request: &mut ConvertRequest, output: &OutputParameters) {
    request.email = flag(output.email);
    request.output_storage = output
        .output_storage
        .as_deref()
        .and_then(non_empty)
        .map(|s| s.to_lowercase());
    request.callback_url = output.callback_url.as_deref().and_then(non_empty);
    request.wait = flag(output.wait);
    request.download_method = match output.download_method {
        DownloadMethod::False => None,
        DownloadMethod::True => Some(DownloadSelector::Attachment),
        DownloadMethod::Inline => Some(DownloadSelector::Inline),
    };
    request.save_to_server = flag(output.save_to_server);
}

/// Write the fields owned by `ConversionParameters`.
pub fn apply_conversion(request: &mut ConvertRequest, conversion: &ConversionParameters) {
    request.output_format = non_empty(&conversion.output_format);
    request.converter_options = conversion
        .converter_options
        .as_ref()
        .filter(|options| !options.normalize().is_empty())
        .cloned();
    request.preset_id = conversion.preset_id.as_deref().and_then(non_empty);
    request.timeout = (conversion.timeout > 0).then_some(conversion.timeout);
}

pub(crate) fn require(name: &str, value: &str) -> Result<(), ConvertError> {
    if value.trim().is_empty() {
        return Err(ConvertError::invalid(format!("{name} must not be empty")));
    }
    Ok(())
}

fn non_empty(value: &str) -> Option<String> {
    (!value.is_empty()).then(|| value.to_string())
}

fn flag(value: bool) -> Option<bool> {
    value.then_some(true)
}
