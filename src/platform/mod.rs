// Collaborators outside the frame-to-request core

pub mod hands;
