//! Procedural macros for tagval.
//!
//! - `#[derive(Record)]` - emits a record's shape descriptor and its
//!   read-only field accessor, so `tagval_core::Validator` can check it.

use proc_macro::TokenStream;

/// Record derive implementation.
mod record;

/// Derives `tagval_core::Record` and `tagval_core::Reflect` for a struct.
///
/// Field attributes:
/// - `#[validate("gt=10,ls=20")]` - the field's rule tag
/// - `#[validate(opaque)]` - the field type does not implement `Reflect`;
///   it is reported as an opaque value
///
/// ```ignore
/// #[derive(Record)]
/// struct Order {
///     #[validate("gt=0")]
///     pub qty: u32,
///     #[validate(opaque)]
///     on_change: Box<dyn Fn() + Send>,
/// }
/// ```
///
/// Private fields are readable because the generated impl lives in the
/// type's own module. Enums, unions and types with lifetime parameters are
/// rejected.
#[proc_macro_derive(Record, attributes(validate))]
pub fn derive_record(input: TokenStream) -> TokenStream {
    record::derive_record(input)
}
