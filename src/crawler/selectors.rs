//! CSS selectors for the SEI portal
//!
//! These must match the portal's markup exactly.

/// Login form submit button
pub const LOGIN_SUBMIT: &str = "#sbmLogin";

/// Login form username field
pub const USERNAME_INPUT: &str = "#txtUsuario";

/// Login form password field
pub const PASSWORD_INPUT: &str = "#pwdSenha";

/// Login form organization dropdown
pub const ORGANIZATION_SELECT: &str = "#selOrgao";

/// Unit dropdown shown on every page after login
pub const UNIT_SELECT: &str = "#selInfraUnidades";

/// Inbound record list of the selected unit
pub const RECORD_LIST_TABLE: &str = "#tblProcessosRecebidos";

/// Rows of the record list, relative to the list table
pub const RECORD_LIST_ROWS: &str = "tbody tr";

/// Cells of a record list row
pub const RECORD_LIST_CELLS: &str = "td";

/// Zero-based index of the cell holding the record link
pub const RECORD_LINK_CELL: usize = 2;

/// "Next page" control under the record list
pub const NEXT_PAGE: &str = "#pagingNext";

/// Frame holding the record's document tree
pub const TREE_FRAME: &str = "#ifrArvore";

/// "Consultar Andamento" link inside the tree frame
pub const PROGRESS_TRIGGER: &str = "#divConsultarAndamento > a";

/// Frame the progress view renders into
pub const CONTENT_FRAME: &str = "#ifrVisualizacao";

/// Progress history table inside the content frame
pub const HISTORY_TABLE: &str = "#tblHistorico";

/// Row of the history table holding the wanted fields
pub const HISTORY_ROW: &str = "tbody tr:nth-child(2)";
