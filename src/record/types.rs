//! Record type codes and the container registry.
//!
//! Every record in the stream carries a 16-bit type code. Document-layer
//! codes live below 0xF000; the drawing layer (MS-ODRAW) occupies the
//! 0xF000 range and reuses the same 8-byte framing.
/// Document-layer record types (per MS-PPT record numbering).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum RecordType {
    /// Unknown record type, raw code preserved on the node
    Unknown = 0,
    /// Document container
    Document = 1000,
    /// Document atom
    DocumentAtom = 1001,
    /// End document marker
    EndDocument = 1002,
    /// Slide container
    Slide = 1006,
    /// Slide atom
    SlideAtom = 1007,
    /// Notes container
    Notes = 1008,
    /// Notes atom
    NotesAtom = 1009,
    /// Environment container
    Environment = 1010,
    /// Slide persist atom (one entry of a SlideListWithText)
    SlidePersistAtom = 1011,
    /// Main master container
    MainMaster = 1016,
    /// External object list container
    ExObjList = 1033,
    /// External object list atom (seed)
    ExObjListAtom = 1034,
    /// Drawing group container (document level)
    PPDrawingGroup = 1035,
    /// Drawing container (sheet level)
    PPDrawing = 1036,
    /// Color scheme atom
    ColorSchemeAtom = 2032,
    /// Placeholder atom
    OEPlaceholderAtom = 3011,
    /// Outline text reference atom
    OutlineTextRefAtom = 3998,
    /// Text header atom
    TextHeaderAtom = 3999,
    /// Wide (UTF-16LE) text atom
    TextCharsAtom = 4000,
    /// Style run-length table atom
    StyleTextPropAtom = 4001,
    /// Indent-level run-length table atom
    MasterTextPropAtom = 4002,
    /// Master style atom
    TxMasterStyleAtom = 4003,
    /// Text ruler atom
    TextRulerAtom = 4006,
    /// Narrow (code page) text atom
    TextBytesAtom = 4008,
    /// Text special info atom
    TextSpecInfoAtom = 4010,
    /// Font entity atom
    FontEntityAtom = 4023,
    /// Length-implied UTF-16LE string
    CString = 4026,
    /// External hyperlink atom (object id)
    ExHyperlinkAtom = 4051,
    /// External hyperlink container
    ExHyperlink = 4055,
    /// Headers/footers container
    HeadersFooters = 4057,
    /// Headers/footers atom
    HeadersFootersAtom = 4058,
    /// Text-range marker paired with an InteractiveInfo
    TxInteractiveInfoAtom = 4063,
    /// Slide list with text container (role in the instance field)
    SlideListWithText = 4080,
    /// Interactive info container
    InteractiveInfo = 4082,
    /// Interactive info atom
    InteractiveInfoAtom = 4083,
    /// User edit atom
    UserEditAtom = 4085,
    /// Persist pointer full block
    PersistPtrFullBlock = 6001,
    /// Persist pointer incremental block
    PersistPtrIncrementalBlock = 6002,
}

impl From<u16> for RecordType {
    fn from(value: u16) -> Self {
        match value {
            1000 => RecordType::Document,
            1001 => RecordType::DocumentAtom,
            1002 => RecordType::EndDocument,
            1006 => RecordType::Slide,
            1007 => RecordType::SlideAtom,
            1008 => RecordType::Notes,
            1009 => RecordType::NotesAtom,
            1010 => RecordType::Environment,
            1011 => RecordType::SlidePersistAtom,
            1016 => RecordType::MainMaster,
            1033 => RecordType::ExObjList,
            1034 => RecordType::ExObjListAtom,
            1035 => RecordType::PPDrawingGroup,
            1036 => RecordType::PPDrawing,
            2032 => RecordType::ColorSchemeAtom,
            3011 => RecordType::OEPlaceholderAtom,
            3998 => RecordType::OutlineTextRefAtom,
            3999 => RecordType::TextHeaderAtom,
            4000 => RecordType::TextCharsAtom,
            4001 => RecordType::StyleTextPropAtom,
            4002 => RecordType::MasterTextPropAtom,
            4003 => RecordType::TxMasterStyleAtom,
            4006 => RecordType::TextRulerAtom,
            4008 => RecordType::TextBytesAtom,
            4010 => RecordType::TextSpecInfoAtom,
            4023 => RecordType::FontEntityAtom,
            4026 => RecordType::CString,
            4051 => RecordType::ExHyperlinkAtom,
            4055 => RecordType::ExHyperlink,
            4057 => RecordType::HeadersFooters,
            4058 => RecordType::HeadersFootersAtom,
            4063 => RecordType::TxInteractiveInfoAtom,
            4080 => RecordType::SlideListWithText,
            4082 => RecordType::InteractiveInfo,
            4083 => RecordType::InteractiveInfoAtom,
            4085 => RecordType::UserEditAtom,
            6001 => RecordType::PersistPtrFullBlock,
            6002 => RecordType::PersistPtrIncrementalBlock,
            _ => RecordType::Unknown,
        }
    }
}

impl RecordType {
    /// Get the u16 value of this record type.
    ///
    /// `Unknown` maps to 0; callers that need the on-disk code for unknown
    /// records read it from the node's `raw_type` instead.
    #[inline]
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

/// Drawing-layer (MS-ODRAW) record type codes that the model walks.
pub mod escher {
    /// Drawing group container (document level)
    pub const DGG_CONTAINER: u16 = 0xF000;
    /// Drawing container (one per sheet)
    pub const DG_CONTAINER: u16 = 0xF002;
    /// Shape group container
    pub const SPGR_CONTAINER: u16 = 0xF003;
    /// Shape container
    pub const SP_CONTAINER: u16 = 0xF004;
    /// Drawing atom (shape count, last shape id)
    pub const DG: u16 = 0xF008;
    /// Group coordinate atom
    pub const SPGR: u16 = 0xF009;
    /// Shape atom (shape id, flags)
    pub const SP: u16 = 0xF00A;
    /// Property table atom
    pub const OPT: u16 = 0xF00B;
    /// Child anchor atom
    pub const CHILD_ANCHOR: u16 = 0xF00F;
    /// Client anchor atom
    pub const CLIENT_ANCHOR: u16 = 0xF010;
    /// Client data container (holds document-layer records)
    pub const CLIENT_DATA: u16 = 0xF011;
    /// Client text box container (holds document-layer text records)
    pub const CLIENT_TEXTBOX: u16 = 0xF00D;
}

/// Version nibble that marks a record as a container in the drawing layer.
pub const CONTAINER_VERSION: u8 = 0x0F;

/// Whether a record with this type code and version nibble holds child
/// records rather than an opaque payload.
///
/// Document-layer containers are registered by type code. Drawing-layer
/// records are containers when their version nibble is 0xF, except the two
/// client containers which carry version 0 but hold document-layer children.
pub fn is_container(raw_type: u16, version: u8) -> bool {
    match RecordType::from(raw_type) {
        RecordType::Document
        | RecordType::Slide
        | RecordType::Notes
        | RecordType::Environment
        | RecordType::MainMaster
        | RecordType::ExObjList
        | RecordType::ExHyperlink
        | RecordType::HeadersFooters
        | RecordType::SlideListWithText
        | RecordType::InteractiveInfo
        | RecordType::PPDrawingGroup
        | RecordType::PPDrawing => true,
        RecordType::Unknown if raw_type >= 0xF000 => {
            version == CONTAINER_VERSION
                || raw_type == escher::CLIENT_DATA
                || raw_type == escher::CLIENT_TEXTBOX
        }
        _ => false,
    }
}
