//! ZPL package labels.
//!
//! One label per packed parcel: invoice number, `i/N` package counter and a
//! Code-128 barcode of the invoice number.

use crate::job::PrintJob;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    #[error("invoice number is empty")]
    EmptyInvoice,
    #[error("invoice number contains ZPL control characters: {0:?}")]
    ControlCharacters(String),
    #[error("package count must be at least 1")]
    NoPackages,
}

/// Render one ZPL program per package.
pub fn package_labels(invoice: &str, packages: u32) -> Result<Vec<String>, LabelError> {
    let invoice = invoice.trim();
    if invoice.is_empty() {
        return Err(LabelError::EmptyInvoice);
    }
    // ^ and ~ start ZPL commands.
    if invoice.contains(['^', '~']) {
        return Err(LabelError::ControlCharacters(invoice.to_string()));
    }
    if packages == 0 {
        return Err(LabelError::NoPackages);
    }

    Ok((1..=packages)
        .map(|i| render_label(invoice, i, packages))
        .collect())
}

/// Label job with one frame per package.
pub fn package_label_job(
    kind: impl Into<String>,
    invoice: &str,
    packages: u32,
) -> Result<PrintJob, LabelError> {
    Ok(PrintJob::labels(kind, package_labels(invoice, packages)?))
}

fn render_label(invoice: &str, index: u32, total: u32) -> String {
    format!(
        "^XA\n\
         ^FO50,50^A0N,40,40^FDInvoice: {invoice}^FS\n\
         ^FO50,120^A0N,40,40^FDPackage: {index}/{total}^FS\n\
         ^FO50,200^BY2\n\
         ^BCN,100,Y,N,N\n\
         ^FD{invoice}^FS\n\
         ^XZ"
    )
}
