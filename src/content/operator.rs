//! C8: the typed operator union for the content-stream operator set
//! described in §4.7. `Generic` carries any operator this table doesn't
//! recognize (or a recognized one with the wrong operand count) along
//! with its full operand snapshot, per §4.7's error policy.

use crate::object::Object;

#[derive(Debug, Clone, PartialEq)]
pub enum Operator {
    // graphics-state stack
    PushGraphicsState,            // q
    PopGraphicsState,             // Q
    ConcatMatrix([f32; 6]),       // cm

    // line style
    SetLineWidth(f32),            // w
    SetLineCap(i64),              // J
    SetLineJoin(i64),             // j
    SetMiterLimit(f32),           // M
    SetDashPattern(Vec<f32>, f32), // d
    SetRenderingIntent(String),   // ri
    SetFlatness(f32),             // i
    SetExtGState(String),         // gs

    // path construction
    MoveTo(f32, f32),                          // m
    LineTo(f32, f32),                          // l
    CurveTo(f32, f32, f32, f32, f32, f32),     // c
    CurveToV(f32, f32, f32, f32),              // v (first control point = current point)
    CurveToY(f32, f32, f32, f32),              // y (second control point = endpoint)
    Rectangle(f32, f32, f32, f32),             // re
    ClosePath,                                  // h

    // path painting
    Stroke,                        // S
    CloseAndStroke,                // s
    Fill,                          // f / F
    FillEvenOdd,                   // f*
    FillAndStroke,                 // B
    FillAndStrokeEvenOdd,          // B*
    CloseFillAndStroke,            // b
    CloseFillAndStrokeEvenOdd,     // b*
    EndPathNoPaint,                // n

    // clipping
    ClipNonZero,    // W
    ClipEvenOdd,    // W*

    // text objects
    BeginText, // BT
    EndText,   // ET

    // text state
    SetCharSpacing(f32),          // Tc
    SetWordSpacing(f32),          // Tw
    SetHorizontalScaling(f32),    // Tz
    SetLeading(f32),              // TL
    SetFont(String, f32),         // Tf
    SetRenderingMode(i64),        // Tr
    SetTextRise(f32),             // Ts

    // text positioning
    MoveTextPosition(f32, f32),                // Td
    MoveTextPositionAndSetLeading(f32, f32),   // TD
    SetTextMatrix([f32; 6]),                   // Tm
    NextLine,                                  // T*

    // text showing
    ShowText(Vec<u8>),                         // Tj
    ShowTextArray(Vec<TextArrayItem>),         // TJ
    NextLineShowText(Vec<u8>),                 // '
    SetSpacingNextLineShowText(f32, f32, Vec<u8>), // "

    // color
    SetFillColorSpace(String),   // cs
    SetStrokeColorSpace(String), // CS
    SetFillColor(Vec<f32>, Option<String>),    // sc / scn
    SetStrokeColor(Vec<f32>, Option<String>),  // SC / SCN
    SetFillGray(f32),            // g
    SetStrokeGray(f32),          // G
    SetFillRgb(f32, f32, f32),   // rg
    SetStrokeRgb(f32, f32, f32), // RG
    SetFillCmyk(f32, f32, f32, f32),   // k
    SetStrokeCmyk(f32, f32, f32, f32), // K

    // xobjects / inline images
    PaintXObject(String),                       // Do
    InlineImage { params: Vec<(String, Object)>, data: Vec<u8> }, // BI..ID..EI

    // marked content / compatibility (parsed and ignored)
    MarkedContentPoint,  // MP / BMC-style point with no dict
    BeginMarkedContent,  // BMC / BDC
    EndMarkedContent,    // EMC
    BeginCompatibility,  // BX
    EndCompatibility,    // EX

    /// Anything not in the table above, or a recognized operator that
    /// received the wrong operand count (§4.7: "fall through to a
    /// generic operator record and proceed").
    Generic { name: String, operands: Vec<Object> },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TextArrayItem {
    String(Vec<u8>),
    Adjustment(f32),
}
