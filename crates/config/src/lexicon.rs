//! Locale Lexicon
//!
//! Word lists driving normalization and slot extraction. Everything here is
//! data: a different locale ships a different lexicon file, the extractor
//! and state machine stay the same. Entries may be written with accents;
//! consumers fold them before matching.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use expense_agent_core::PaymentMethod;

/// Phrases that name a payment method
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentKeywords {
    pub method: PaymentMethod,
    pub phrases: Vec<String>,
}

impl PaymentKeywords {
    fn new(method: PaymentMethod, phrases: &[&str]) -> Self {
        Self {
            method,
            phrases: to_strings(phrases),
        }
    }
}

/// Locale word lists
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LexiconConfig {
    /// Locale tag, informational
    pub locale: String,
    /// Words dropped from descriptions and meaningful-token lists
    pub stop_words: Vec<String>,
    /// First-person singular action verbs ("gastei")
    pub singular_verbs: Vec<String>,
    /// First-person plural action verbs ("gastamos")
    pub plural_verbs: Vec<String>,
    /// Payment method phrases
    pub payment_keywords: Vec<PaymentKeywords>,
    /// Generic payment-instrument words stripped from descriptions
    pub instrument_words: Vec<String>,
    /// Words marking a number as money
    pub currency_words: Vec<String>,
    /// Units that mark a number as a quantity
    pub quantity_units: Vec<String>,
    /// Confirmation replies ("sim", "ok")
    pub confirmation_words: Vec<String>,
    /// Words that discard the conversation
    pub reset_words: Vec<String>,
    /// Descriptions of two letters or fewer that are still valid
    pub short_description_allow_list: Vec<String>,
    /// Regexes (matched on folded text) for transcription noise
    pub nonsense_patterns: Vec<String>,
    /// Answers meaning "mine"
    pub self_hints: Vec<String>,
    /// Answers meaning "shared"
    pub shared_hints: Vec<String>,
    /// Nouns introducing an owner ("gasto do Felipe")
    pub responsible_markers: Vec<String>,
    /// Prepositions between a marker and the owner
    pub owner_prepositions: Vec<String>,
    /// Words introducing an explicit category
    pub category_markers: Vec<String>,
    /// Words introducing a card name
    pub card_markers: Vec<String>,
    /// Words following an installment count ("3 vezes")
    pub installment_words: Vec<String>,
    /// Words asking for a split without a count ("parcelado")
    pub split_words: Vec<String>,
    /// Phrases meaning a single upfront payment
    pub upfront_phrases: Vec<String>,
    /// Words marking the next number as a date
    pub date_markers: Vec<String>,
    /// Multiplier words ("2 mil")
    pub thousand_words: Vec<String>,
    /// Spelled-out numbers
    pub number_words: BTreeMap<String, u32>,
}

impl Default for LexiconConfig {
    fn default() -> Self {
        Self::pt_br()
    }
}

impl LexiconConfig {
    /// Brazilian Portuguese lexicon
    pub fn pt_br() -> Self {
        Self {
            locale: "pt-BR".to_string(),
            stop_words: to_strings(&[
                "a", "à", "o", "os", "as", "um", "uma", "uns", "umas", "de", "do", "da", "dos",
                "das", "no", "na", "nos", "nas", "num", "numa", "em", "com", "pra", "pro", "pras",
                "pros", "para", "por", "pelo", "pela", "e", "ou", "que", "eu", "me", "meu",
                "minha", "mim", "nós", "nosso", "nossa", "já", "foi", "é", "hoje", "ontem",
                "anteontem", "agora", "aqui", "ali", "lá", "aí", "então", "isso", "esse", "essa",
                "este", "esta", "tudo", "mais", "só", "também", "gasto", "gastos", "despesa",
                "despesas", "compra", "compras", "valor", "total", "reais", "real", "r", "rs",
                "conto", "contos", "pila", "pilas", "mil", "custou", "deu", "ficou", "saiu",
            ]),
            singular_verbs: to_strings(&[
                "gastei", "comprei", "paguei", "fiz", "torrei", "passei", "transferi", "pedi",
                "abasteci", "almocei", "jantei", "assinei", "contratei", "coloquei", "botei",
            ]),
            plural_verbs: to_strings(&[
                "gastamos", "compramos", "pagamos", "fizemos", "torramos", "passamos",
                "transferimos", "pedimos", "abastecemos", "almoçamos", "jantamos", "assinamos",
                "contratamos", "colocamos", "botamos",
            ]),
            payment_keywords: vec![
                PaymentKeywords::new(
                    PaymentMethod::Credit,
                    &["cartão de crédito", "crédito", "parcelado", "parcelada", "parcelei"],
                ),
                PaymentKeywords::new(PaymentMethod::Debit, &["cartão de débito", "débito"]),
                PaymentKeywords::new(PaymentMethod::Pix, &["pix"]),
                PaymentKeywords::new(
                    PaymentMethod::Cash,
                    &["dinheiro", "espécie", "em mãos", "cash"],
                ),
                PaymentKeywords::new(PaymentMethod::Boleto, &["boleto"]),
                PaymentKeywords::new(
                    PaymentMethod::Transfer,
                    &["transferência", "transferi", "ted"],
                ),
            ],
            instrument_words: to_strings(&["cartão", "card", "maquininha"]),
            currency_words: to_strings(&[
                "reais", "real", "r", "rs", "brl", "conto", "contos", "pila", "pilas", "pratas",
            ]),
            quantity_units: to_strings(&[
                "kg", "g", "gr", "grama", "gramas", "quilo", "quilos", "kilo", "kilos", "litro",
                "litros", "l", "ml", "unidade", "unidades", "un", "und", "polegada", "polegadas",
                "pol", "metro", "metros", "m", "cm", "pacote", "pacotes", "caixa", "caixas", "par",
                "pares", "dúzia", "dúzias", "fardo", "fardos", "lata", "latas", "garrafa",
                "garrafas",
            ]),
            confirmation_words: to_strings(&[
                "sim", "ok", "okay", "isso", "certo", "confirmo", "pode", "beleza", "blz", "s",
                "ss", "positivo", "exato", "claro", "uhum", "aham", "correto", "perfeito",
                "fechado",
            ]),
            reset_words: to_strings(&[
                "cancelar", "cancela", "cancele", "reset", "resetar", "recomeçar", "reiniciar",
                "esquece", "esqueça", "esquecer", "desistir", "apagar", "apaga",
            ]),
            short_description_allow_list: to_strings(&["tv", "pc", "cd", "ps"]),
            nonsense_patterns: to_strings(&[
                r"^(?:a+h*|e+h*|o+h*|h+m+|u+h*m*|hu+m+)$",
                r"^(?:ha|he|hi|ka|rs)+h?$",
                r"^k{2,}$",
                r"^(?:bla)+$",
                r"^(?:teste|testando|alo|oi|ola|opa)$",
                r"^[^a-z0-9]*$",
            ]),
            self_hints: to_strings(&[
                "eu", "mim", "meu", "minha", "pessoal", "próprio", "própria", "sozinho", "sozinha",
            ]),
            shared_hints: to_strings(&[
                "nós", "nosso", "nossa", "nossos", "nossas", "família", "casa", "compartilhado",
                "compartilhada", "dividido", "dividida", "conjunto", "conjunta", "todos", "casal",
            ]),
            responsible_markers: to_strings(&[
                "gasto", "gastos", "despesa", "despesas", "compra", "compras",
            ]),
            owner_prepositions: to_strings(&["do", "da", "de", "dos", "das"]),
            category_markers: to_strings(&["categoria", "category"]),
            card_markers: to_strings(&["cartão"]),
            installment_words: to_strings(&[
                "x", "vezes", "vez", "parcelas", "parcela", "prestações", "prestação",
            ]),
            split_words: to_strings(&[
                "parcelado", "parcelada", "parcelei", "parcelar", "parcelamos", "parcelamento",
            ]),
            upfront_phrases: to_strings(&["à vista", "avista"]),
            date_markers: to_strings(&["dia", "dias", "data"]),
            thousand_words: to_strings(&["mil"]),
            number_words: [
                ("um", 1),
                ("uma", 1),
                ("dois", 2),
                ("duas", 2),
                ("três", 3),
                ("quatro", 4),
                ("cinco", 5),
                ("seis", 6),
                ("sete", 7),
                ("oito", 8),
                ("nove", 9),
                ("dez", 10),
                ("onze", 11),
                ("doze", 12),
                ("dezoito", 18),
                ("vinte", 20),
            ]
            .iter()
            .map(|(w, n)| (w.to_string(), *n))
            .collect(),
        }
    }

    /// Phrases for a payment method
    pub fn payment_phrases(&self, method: PaymentMethod) -> impl Iterator<Item = &str> {
        self.payment_keywords
            .iter()
            .filter(move |k| k.method == method)
            .flat_map(|k| k.phrases.iter().map(|p| p.as_str()))
    }
}

fn to_strings(words: &[&str]) -> Vec<String> {
    words.iter().map(|w| w.to_string()).collect()
}
