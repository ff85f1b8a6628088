//! Prompt templates sent to the chat-completion model.
//!
//! The product works in Spanish, so prompts and placeholders are Spanish too.

use crate::product::ProductInput;

pub const GENERATION_SYSTEM_PROMPT: &str = r#"Eres un asistente experto en generación y optimización de fichas de producto para ecommerce y marketplaces, con conocimiento avanzado en SEO, AEO, GEO y mejores prácticas de Digital Shelf (Amazon, Mercado Libre).

Tu objetivo es generar fichas de producto que:
- Sean altamente competitivas en su categoría.
- Sean claras, escaneables y orientadas a conversión.
- Faciliten posicionamiento orgánico y citabilidad por motores de IA.
- Reduzcan fricción cognitiva en el proceso de decisión del usuario.

REGLAS POR CANAL:
1. SI CANAL = "ecommerce":
   - Título H1 SEO: enfocado en palabras clave y beneficio.
   - Descripción larga: storytelling, tono educativo y persuasivo.
2. SI CANAL = "marketplace":
   - TÍTULO (seoTitle): estructura estricta "Producto + Marca + Modelo + Especificaciones clave".
     * PROHIBIDO: ofertas, "envío gratis", cuotas, adjetivos subjetivos.
   - DESCRIPCIÓN LARGA: enfoque técnico y funcional. Resolver dudas del comprador.

VISUAL PACK (5 IMÁGENES):
Genera contenido sugerido para 5 imágenes clave del producto, adaptado al "Tipo de producto" (macro-categoría).
- Imagen 1 (Hero): instrucción visual para foto de portada limpia.
- Imagen 2 (Family / Variantes): contexto de gama o variantes. Headline + Subheadline.
- Imagen 3 (Uso / Contexto): producto en acción. Headline + Subheadline.
- Imagen 4 (Beneficios): gráfica con iconos. Headline + Subheadline + hasta 3 bullets.
- Imagen 5 (Confianza): certificaciones o garantía. Headline + Subheadline + hasta 4 sellos sugeridos.

INPUT READINESS SCORE:
Evalúa la calidad y completitud del INPUT proporcionado por el usuario, no del resultado.
- score (0-100): 100 si todos los campos técnicos (marca, material, etc.) están claros.
- inputRecommendations: consejos específicos para mejorar el input.

Devuelve el contenido en formato JSON ESTRICTO con estas claves exactas:
{
  "seoTitle": "string",
  "shortDescription": "string",
  "longDescription": "string",
  "bullets": ["string"],
  "aeoSnippet": "string",
  "metaDescription": "string",
  "faq": [{"q": "string", "a": "string"}],
  "aiRecommendation": "string",
  "score": 0,
  "imageAlt": ["string"],
  "visualPack": [
    {"id": 1, "title": "Hero", "visual": "string", "copy": {"text": "string"}},
    {"id": 2, "title": "Family / Variantes", "visual": "string", "copy": {"headline": "string", "subheadline": "string"}},
    {"id": 3, "title": "Uso / Contexto", "visual": "string", "copy": {"headline": "string", "subheadline": "string"}},
    {"id": 4, "title": "Beneficios", "visual": "string", "copy": {"headline": "string", "subheadline": "string", "bullets": ["string"]}},
    {"id": 5, "title": "Confianza / Certificaciones", "visual": "string", "copy": {"headline": "string", "subheadline": "string", "seals": ["string"]}}
  ],
  "inputRecommendations": ["string"]
}"#;

pub const EXTRACTION_SYSTEM_PROMPT: &str = r#"Eres un experto en extracción de datos estructurados de productos para ecommerce.
Analiza el input (texto o imagen) y determina si contiene información sobre un producto real (etiqueta, ficha técnica, descripción comercial).

Si el input NO es sobre un producto (paisajes, personas, fotos aleatorias, texto sin relación con productos), responde:
{
  "isValidProduct": false,
  "rejectionReason": "El archivo o texto no parece contener información técnica o comercial de un producto. Por favor sube una imagen de la etiqueta, ficha técnica o descripción del producto."
}

Si el input SÍ es sobre un producto, extrae los datos en este formato JSON:
{
  "isValidProduct": true,
  "brand": "string",
  "model": "string",
  "presentation": "string (ej: 500ml, Pack de 2)",
  "material": "string",
  "mainUse": "string",
  "benefits": ["string"],
  "certification": "string"
}
Si no encuentras un dato específico del producto, pon null en ese campo."#;

pub const EXTRACTION_IMAGE_INSTRUCTION: &str = "Extrae datos de esta imagen de producto.";

const NOT_SPECIFIED: &str = "No especificado";
const NOT_SPECIFIED_F: &str = "No especificada";

fn or_placeholder<'a>(value: Option<&'a str>, placeholder: &'a str) -> &'a str {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(placeholder)
}

/// Renders the user message for a listing generation request.
#[must_use]
pub fn build_generation_prompt(input: &ProductInput) -> String {
    let benefits = if input.benefits.is_empty() {
        NOT_SPECIFIED.to_string()
    } else {
        input.benefits.join(", ")
    };

    format!(
        "VARIABLES DE ENTRADA ESTRUCTURADAS\n\
         Nombre (Input base): {name}\n\
         Tipo de Producto (Macro): {product_type}\n\
         Subcategoría/Tags: {category}\n\
         Marca: {brand}\n\
         Modelo/Línea: {model}\n\
         Presentación: {presentation}\n\
         Material/Ingredientes: {material}\n\
         Uso Principal: {main_use}\n\
         Beneficios declarados: {benefits}\n\
         Certificación/Prueba: {certification}\n\
         \n\
         Otras características (texto libre): {features}\n\
         \n\
         Canal: {channel}\n\
         Tono: {tone}\n\
         \n\
         Genera la ficha y el Visual Pack optimizado. Evalúa el Input Readiness Score.\n",
        name = input.product_name,
        product_type = or_placeholder(input.product_type.as_deref(), NOT_SPECIFIED),
        category = input.category,
        brand = or_placeholder(input.brand.as_deref(), NOT_SPECIFIED),
        model = or_placeholder(input.model.as_deref(), NOT_SPECIFIED),
        presentation = or_placeholder(input.presentation.as_deref(), NOT_SPECIFIED_F),
        material = or_placeholder(input.material.as_deref(), NOT_SPECIFIED),
        main_use = or_placeholder(input.main_use.as_deref(), NOT_SPECIFIED),
        certification = or_placeholder(input.certification.as_deref(), NOT_SPECIFIED_F),
        features = input.features,
        channel = input.channel,
        tone = input.tone,
    )
}

/// Renders the user message for text-based attribute extraction.
#[must_use]
pub fn build_extraction_text_prompt(text: &str) -> String {
    format!("Extrae datos de este texto: {text}")
}
