//! Family decoders and the raw data they produce

pub mod classic;
pub mod desfire;
pub mod felica;
pub mod iso7816;
pub mod ultralight;

pub use classic::ClassicDecoder;
pub use desfire::DesfireDecoder;
pub use felica::FelicaDecoder;
pub use iso7816::Iso7816Decoder;
pub use ultralight::UltralightDecoder;
