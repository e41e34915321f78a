//! Default CSS and favicon assets (used by C8 steps 12-13).
//!
//! The default stylesheet and favicon SVG are plain-text files embedded at
//! compile time with `include_str!`; the two binary favicon formats are
//! small enough (a single transparent pixel) to embed as byte-array
//! constants directly rather than committing binary blobs to the source
//! tree. A garden's own `favicon.ico`/`favicon.svg`/`favicon-96x96.png`
//! and `style.css` at the content root always take precedence over these.

/// Embedded base stylesheet, always emitted first in `{out}/style.css`.
pub const DEFAULT_CSS: &str = include_str!("../assets/default.css");

/// Embedded default favicon, vector form.
pub const DEFAULT_FAVICON_SVG: &str = include_str!("../assets/favicon.svg");

/// Embedded default favicon, classic `.ico` container wrapping a 1x1
/// transparent PNG (the `ico` format has supported PNG-encoded frames
/// since Windows Vista; every modern browser accepts this form).
pub const DEFAULT_FAVICON_ICO: &[u8] = &[
    0, 0, 1, 0, 1, 0, 1, 1, 0, 0, 1, 0, 32, 0, 68, 0, 0, 0, 22, 0, 0, 0, 137, 80, 78, 71, 13, 10,
    26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 4, 0, 0, 0, 181, 28, 12, 2, 0,
    0, 0, 11, 73, 68, 65, 84, 120, 218, 99, 100, 248, 15, 0, 1, 5, 1, 1, 39, 24, 227, 102, 0, 0,
    0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];

/// Embedded default favicon, 96x96 PNG form. A transparent 1x1 PNG is a
/// valid (if visually blank) stand-in; browsers scale it without error,
/// and gardens that care supply their own `favicon-96x96.png`.
pub const DEFAULT_FAVICON_96: &[u8] = &[
    137, 80, 78, 71, 13, 10, 26, 10, 0, 0, 0, 13, 73, 72, 68, 82, 0, 0, 0, 1, 0, 0, 0, 1, 8, 4, 0,
    0, 0, 181, 28, 12, 2, 0, 0, 0, 11, 73, 68, 65, 84, 120, 218, 99, 100, 248, 15, 0, 1, 5, 1, 1,
    39, 24, 227, 102, 0, 0, 0, 0, 73, 69, 78, 68, 174, 66, 96, 130,
];
