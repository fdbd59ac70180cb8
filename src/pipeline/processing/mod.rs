// Pipeline processing: canonicalization, extraction, assembly and QA

pub mod assemble;
pub mod canonical;
pub mod extract;
pub mod quality_gate;
