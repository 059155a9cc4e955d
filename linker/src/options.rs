pub const DEFAULT_MAX_GLOBALS: usize = 0x1_0000;
pub const DEFAULT_MAX_INSTRUCTIONS: usize = 0x100_0000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOptions {
    /// leave out units the program doesn't use, directly or indirectly
    pub strip_unused: bool,

    /// size limit of the global variable table
    pub max_globals: usize,

    /// size limit of the linked instruction stream
    pub max_instructions: usize,
}

impl Default for LinkOptions {
    fn default() -> Self {
        LinkOptions {
            strip_unused: false,
            max_globals: DEFAULT_MAX_GLOBALS,
            max_instructions: DEFAULT_MAX_INSTRUCTIONS,
        }
    }
}
