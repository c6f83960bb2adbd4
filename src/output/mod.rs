// Output formatting — terminal display of drift rankings.

pub mod terminal;
