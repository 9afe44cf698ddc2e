//! Category Taxonomy
//!
//! Ordered keyword rules mapping descriptions to category names, each with a
//! fallback chain tried when the target does not exist in the organization's
//! category list. Corrections run after inference and fix known keyword
//! collisions.

use serde::{Deserialize, Serialize};

/// Keyword rule: any keyword hit selects `target`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keywords: Vec<String>,
    pub target: String,
    /// Tried in order when `target` is not in the directory
    #[serde(default)]
    pub fallback: Vec<String>,
}

/// Post-inference correction
///
/// Applies when the inferred category is one of `when` and the description
/// hits one of `keywords`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryCorrection {
    pub keywords: Vec<String>,
    pub when: Vec<String>,
    pub target: String,
    #[serde(default)]
    pub fallback: Vec<String>,
}

/// Category inference tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryTaxonomy {
    /// Category used when nothing else applies
    pub catch_all: String,
    /// First matching rule wins
    pub rules: Vec<CategoryRule>,
    pub corrections: Vec<CategoryCorrection>,
}

impl Default for CategoryTaxonomy {
    fn default() -> Self {
        Self::pt_br()
    }
}

fn rule(keywords: &[&str], target: &str, fallback: &[&str]) -> CategoryRule {
    CategoryRule {
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
        target: target.to_string(),
        fallback: fallback.iter().map(|f| f.to_string()).collect(),
    }
}

/// Appliance words, shared by the rule and its correction
const APPLIANCES: &[&str] = &[
    "geladeira", "geladeiras", "fogão", "fogões", "tv", "tvs", "televisão", "televisões",
    "televisor", "microondas", "micro-ondas", "máquina de lavar", "lavadora", "secadora",
    "liquidificador", "batedeira", "air fryer", "airfryer", "ventilador", "ar condicionado",
    "aspirador", "cafeteira", "freezer",
];

impl CategoryTaxonomy {
    /// Brazilian Portuguese taxonomy
    pub fn pt_br() -> Self {
        Self {
            catch_all: "Outros".to_string(),
            rules: vec![
                rule(
                    &[
                        "mercado", "supermercado", "hortifruti", "feira", "açougue", "atacadão",
                        "assaí", "carrefour", "arroz", "feijão", "sal", "açúcar", "leite",
                        "óleo", "café", "ovos", "carne", "frango",
                    ],
                    "Supermercado",
                    &["Alimentação", "Casa"],
                ),
                rule(
                    &[
                        "restaurante", "lanchonete", "lanche", "almoço", "jantar", "pizza",
                        "pizzaria", "hamburguer", "burger", "ifood", "rappi", "sushi", "bar",
                        "churrascaria", "marmita",
                    ],
                    "Restaurantes",
                    &["Alimentação"],
                ),
                rule(&["padaria", "pão", "pães", "confeitaria"], "Padaria", &["Alimentação"]),
                rule(
                    &[
                        "uber", "99pop", "taxi", "táxi", "ônibus", "metrô", "trem", "passagem",
                        "estacionamento", "pedágio", "bilhete único",
                    ],
                    "Transporte",
                    &[],
                ),
                rule(
                    &["gasolina", "combustível", "etanol", "álcool", "diesel", "posto", "abasteci"],
                    "Combustível",
                    &["Transporte"],
                ),
                rule(
                    &["farmácia", "drogaria", "remédio", "remédios", "medicamento", "droga raia"],
                    "Farmácia",
                    &["Saúde"],
                ),
                rule(
                    &[
                        "médico", "consulta", "dentista", "exame", "exames", "hospital",
                        "plano de saúde", "psicólogo", "terapia", "fisioterapia",
                    ],
                    "Saúde",
                    &[],
                ),
                rule(
                    &[
                        "barbeiro", "barbearia", "cabelo", "cabeleireiro", "salão", "manicure",
                        "unha", "depilação", "estética",
                    ],
                    "Beleza",
                    &["Cuidados Pessoais"],
                ),
                rule(
                    &[
                        "aluguel", "condomínio", "luz", "energia", "água", "gás", "internet",
                        "faxina", "diarista",
                    ],
                    "Moradia",
                    &["Casa"],
                ),
                rule(
                    &["iptu", "ipva", "imposto", "impostos", "taxa", "tarifa", "multa", "darf"],
                    "Impostos",
                    &["Taxas"],
                ),
                rule(APPLIANCES, "Eletrodomésticos", &["Casa"]),
                rule(
                    &[
                        "cinema", "show", "teatro", "netflix", "spotify", "streaming", "jogo",
                        "viagem", "hotel", "passeio", "ingresso", "parque",
                    ],
                    "Lazer",
                    &[],
                ),
                rule(
                    &[
                        "escola", "faculdade", "curso", "livro", "livros", "mensalidade",
                        "material escolar", "apostila",
                    ],
                    "Educação",
                    &[],
                ),
                rule(
                    &[
                        "roupa", "roupas", "camisa", "camiseta", "calça", "sapato", "tênis",
                        "vestido", "blusa",
                    ],
                    "Vestuário",
                    &[],
                ),
                rule(
                    &["pet", "petshop", "ração", "veterinário", "banho e tosa"],
                    "Pets",
                    &[],
                ),
            ],
            corrections: vec![CategoryCorrection {
                keywords: APPLIANCES.iter().map(|k| k.to_string()).collect(),
                when: vec!["Impostos".to_string(), "Taxas".to_string()],
                target: "Casa".to_string(),
                fallback: vec!["Eletrodomésticos".to_string()],
            }],
        }
    }

    /// Every category name the taxonomy can produce
    pub fn category_names(&self) -> impl Iterator<Item = &str> {
        self.rules
            .iter()
            .flat_map(|r| std::iter::once(r.target.as_str()).chain(r.fallback.iter().map(|f| f.as_str())))
            .chain(std::iter::once(self.catch_all.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_taxes_rule_precedes_appliances() {
        let taxonomy = CategoryTaxonomy::default();
        let position = |target: &str| taxonomy.rules.iter().position(|r| r.target == target);
        assert!(position("Impostos") < position("Eletrodomésticos"));
    }

    #[test]
    fn test_appliance_correction() {
        let taxonomy = CategoryTaxonomy::default();
        let correction = &taxonomy.corrections[0];
        assert!(correction.when.iter().any(|w| w == "Impostos"));
        assert!(correction.keywords.iter().any(|k| k == "geladeira"));
        assert_eq!(correction.target, "Casa");
    }

    #[test]
    fn test_yaml_override() {
        let yaml = r#"
catch_all: Diversos
rules:
  - keywords: [uber]
    target: Mobilidade
"#;
        let taxonomy: CategoryTaxonomy = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(taxonomy.catch_all, "Diversos");
        assert_eq!(taxonomy.rules.len(), 1);
        assert!(taxonomy.rules[0].fallback.is_empty());
        assert!(taxonomy.category_names().any(|n| n == "Mobilidade"));
    }
}
