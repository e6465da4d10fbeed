//! Virtual TA para el curso "Tools in Data Science".
//!
//! Servicio web que responde preguntas de estudiantes buscando por palabras
//! clave en el contenido del curso y en los posts del foro, con síntesis
//! opcional vía LLM. El binario `scrape` genera el corpus offline.

pub mod api;
pub mod app_state;
pub mod caption;
pub mod config;
pub mod corpus;
pub mod crawler;
pub mod error;
pub mod llm;
pub mod models;
pub mod processor;
pub mod responder;
pub mod semantic;
