// Terminal front end for the XB2BX client.

pub mod tui;
