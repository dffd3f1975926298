//! Component bundles and token sets.
//!
//! A bundle is what spawn and insert accept: one or more `(token, value)`
//! pairs. The pair itself is the constructor — a token is identity only, so
//! `(position, Position { x, y })` is a complete component instance. Tuples
//! of bundles are bundles, which gives spawn its variadic feel up to arity
//! eight.

use std::any::Any;

use sandtable_foundation::{Component, TokenId};

/// One or more `(token, value)` component pairs.
pub trait Bundle {
    /// Appends the bundle's token ids to `out`.
    fn collect_tokens(&self, out: &mut Vec<TokenId>);

    /// Moves the bundle's values into `out`, paired with their tokens.
    fn collect_values(self, out: &mut Vec<(TokenId, Box<dyn Any>)>);
}

impl<T: 'static> Bundle for (Component<T>, T) {
    fn collect_tokens(&self, out: &mut Vec<TokenId>) {
        out.push(self.0.id());
    }

    fn collect_values(self, out: &mut Vec<(TokenId, Box<dyn Any>)>) {
        out.push((self.0.id(), Box::new(self.1)));
    }
}

macro_rules! impl_bundle_tuple {
    ($($name:ident),+) => {
        impl<$($name: Bundle),+> Bundle for ($($name,)+) {
            fn collect_tokens(&self, out: &mut Vec<TokenId>) {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                $($name.collect_tokens(out);)+
            }

            fn collect_values(self, out: &mut Vec<(TokenId, Box<dyn Any>)>) {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                $($name.collect_values(out);)+
            }
        }
    };
}

impl_bundle_tuple!(B0);
impl_bundle_tuple!(B0, B1);
impl_bundle_tuple!(B0, B1, B2);
impl_bundle_tuple!(B0, B1, B2, B3);
impl_bundle_tuple!(B0, B1, B2, B3, B4);
impl_bundle_tuple!(B0, B1, B2, B3, B4, B5);
impl_bundle_tuple!(B0, B1, B2, B3, B4, B5, B6);
impl_bundle_tuple!(B0, B1, B2, B3, B4, B5, B6, B7);

/// One or more bare component tokens, for remove and archetype
/// pre-registration.
pub trait TokenSet {
    /// Appends the set's token ids to `out`.
    fn collect_tokens(&self, out: &mut Vec<TokenId>);
}

impl<T: 'static> TokenSet for Component<T> {
    fn collect_tokens(&self, out: &mut Vec<TokenId>) {
        out.push(self.id());
    }
}

macro_rules! impl_token_set_tuple {
    ($($name:ident),+) => {
        impl<$($name: TokenSet),+> TokenSet for ($($name,)+) {
            fn collect_tokens(&self, out: &mut Vec<TokenId>) {
                #[allow(non_snake_case)]
                let ($($name,)+) = self;
                $($name.collect_tokens(out);)+
            }
        }
    };
}

impl_token_set_tuple!(S0);
impl_token_set_tuple!(S0, S1);
impl_token_set_tuple!(S0, S1, S2);
impl_token_set_tuple!(S0, S1, S2, S3);
impl_token_set_tuple!(S0, S1, S2, S3, S4);
impl_token_set_tuple!(S0, S1, S2, S3, S4, S5);
impl_token_set_tuple!(S0, S1, S2, S3, S4, S5, S6);
impl_token_set_tuple!(S0, S1, S2, S3, S4, S5, S6, S7);
