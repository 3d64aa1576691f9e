//! 기본 카탈로그 데이터
//!
//! 신규 배포에서 카탈로그 테이블이 비어 있을 때 삽입되는 기본 도구와
//! 티켓 팩입니다. 운영 중에는 관리자 API로만 변경합니다.

use log::{info, warn};

use crate::catalog::CatalogService;
use crate::db::models::{PackageRecord, ToolRecord};
use crate::ledger::error::LedgerError;

/// 기본 카탈로그 데이터셋
#[derive(Debug, Clone)]
pub struct DefaultCatalog {
    pub tools: Vec<ToolRecord>,
    pub packages: Vec<PackageRecord>,
}

impl Default for DefaultCatalog {
    fn default() -> Self {
        let tools = vec![
            // 개발 카테고리: 생성 API 연동 도구
            ToolRecord {
                tool_id: "script-generator".to_string(),
                name: "Générateur de scripts".to_string(),
                description: "Génère des scripts prêts à l'emploi à partir d'une description.".to_string(),
                ticket_cost: 10,
                is_affiliate: false,
                category: "development".to_string(),
                url: None,
                promo_code: None,
                icon_name: "code".to_string(),
                model: Some("gpt-3.5-turbo".to_string()),
                system_prompt: Some(
                    "Tu es un développeur senior. Génère un script complet, commenté et \
                     directement utilisable répondant à la demande de l'utilisateur."
                        .to_string(),
                ),
                use_api: true,
                usage_instructions: Some(
                    "Décrivez le script souhaité (langage, entrée, sortie attendue).".to_string(),
                ),
            },
            ToolRecord {
                tool_id: "landing-copy".to_string(),
                name: "Rédacteur de pages d'atterrissage".to_string(),
                description: "Rédige le texte complet d'une page d'atterrissage.".to_string(),
                ticket_cost: 8,
                is_affiliate: false,
                category: "marketing".to_string(),
                url: None,
                promo_code: None,
                icon_name: "layout".to_string(),
                model: Some("gpt-3.5-turbo".to_string()),
                system_prompt: Some(
                    "Tu es un copywriter francophone. Rédige un texte de page d'atterrissage \
                     persuasif: titre, sous-titre, trois arguments, appel à l'action."
                        .to_string(),
                ),
                use_api: true,
                usage_instructions: Some(
                    "Indiquez le produit, la cible et le ton souhaité.".to_string(),
                ),
            },
            ToolRecord {
                tool_id: "seo-briefs".to_string(),
                name: "Briefs SEO".to_string(),
                description: "Produit un brief SEO structuré pour un mot-clé donné.".to_string(),
                ticket_cost: 5,
                is_affiliate: false,
                category: "marketing".to_string(),
                url: None,
                promo_code: None,
                icon_name: "search".to_string(),
                model: Some("gpt-3.5-turbo".to_string()),
                system_prompt: Some(
                    "Tu es un consultant SEO. Produis un brief structuré: intention de \
                     recherche, plan H2/H3, questions fréquentes, maillage interne."
                        .to_string(),
                ),
                use_api: true,
                usage_instructions: Some("Donnez le mot-clé principal et la langue cible.".to_string()),
            },
            // 제휴 카테고리: 무비용 리다이렉트 도구
            ToolRecord {
                tool_id: "hosting-partner".to_string(),
                name: "Hébergement partenaire".to_string(),
                description: "Hébergement web recommandé avec remise partenaire.".to_string(),
                ticket_cost: 0,
                is_affiliate: true,
                category: "development".to_string(),
                url: Some("https://hosting.example.com/?ref=autocreateur".to_string()),
                promo_code: Some("AUTOCREATEUR10".to_string()),
                icon_name: "server".to_string(),
                model: None,
                system_prompt: None,
                use_api: false,
                usage_instructions: Some(
                    "Utilisez le code promo lors de la commande pour la remise.".to_string(),
                ),
            },
        ];

        let packages = vec![
            PackageRecord {
                package_id: "pack-decouverte".to_string(),
                name: "Pack Découverte".to_string(),
                amount: 20,
                price: 4.99,
            },
            PackageRecord {
                package_id: "50-pack".to_string(),
                name: "Pack 50".to_string(),
                amount: 50,
                price: 9.99,
            },
            PackageRecord {
                package_id: "pack-pro".to_string(),
                name: "Pack Pro".to_string(),
                amount: 120,
                price: 19.99,
            },
        ];

        Self { tools, packages }
    }
}

/// 카탈로그가 비어 있으면 기본 데이터 삽입
pub async fn seed_catalog(catalog: &CatalogService) -> Result<(), LedgerError> {
    if !catalog.is_empty().await? {
        return Ok(());
    }

    warn!("카탈로그가 비어 있음, 기본 데이터 삽입");

    let dataset = DefaultCatalog::default();

    for tool in &dataset.tools {
        catalog.add_tool(tool).await?;
    }

    for package in &dataset.packages {
        catalog.add_package(package).await?;
    }

    info!(
        "기본 카탈로그 삽입 완료: 도구 {}개, 티켓 팩 {}개",
        dataset.tools.len(),
        dataset.packages.len()
    );

    Ok(())
}
