use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_societes_table::Migration),
            Box::new(m20250101_000002_create_articles_table::Migration),
            Box::new(m20250101_000003_create_price_rules_table::Migration),
            Box::new(m20250101_000004_create_menu_tables::Migration),
            Box::new(m20250101_000005_create_shared_catalog_tables::Migration),
        ]
    }
}

/// Tables created by [`Migrator`], used by the integrity report
pub const MANAGED_TABLES: &[&str] = &[
    "societes",
    "articles",
    "price_rules",
    "menu_configurations",
    "menu_items",
    "shared_materials",
    "shared_processes",
    "shared_quality_standards",
    "shared_suppliers",
];

/// Columns shared by every business table
#[derive(DeriveIden)]
enum Audit {
    CreatedAt,
    UpdatedAt,
    DeletedAt,
    Version,
    CreatedById,
    UpdatedById,
}

fn with_audit_columns(table: &mut TableCreateStatement) -> &mut TableCreateStatement {
    table
        .col(
            ColumnDef::new(Audit::CreatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Audit::UpdatedAt)
                .timestamp_with_time_zone()
                .not_null(),
        )
        .col(
            ColumnDef::new(Audit::DeletedAt)
                .timestamp_with_time_zone()
                .null(),
        )
        .col(
            ColumnDef::new(Audit::Version)
                .integer()
                .not_null()
                .default(1),
        )
        .col(ColumnDef::new(Audit::CreatedById).uuid().null())
        .col(ColumnDef::new(Audit::UpdatedById).uuid().null())
}

fn index(name: &str, table: impl IntoIden + 'static, columns: Vec<DynIden>) -> IndexCreateStatement {
    let mut stmt = Index::create();
    stmt.if_not_exists().name(name).table(table);
    for column in columns {
        stmt.col(column);
    }
    stmt.to_owned()
}

mod m20250101_000001_create_societes_table {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000001_create_societes_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    with_audit_columns(
                        Table::create()
                            .table(Societes::Table)
                            .if_not_exists()
                            .col(ColumnDef::new(Societes::Id).uuid().not_null().primary_key())
                            .col(
                                ColumnDef::new(Societes::Code)
                                    .string_len(20)
                                    .not_null()
                                    .unique_key(),
                            )
                            .col(ColumnDef::new(Societes::Nom).string_len(255).not_null())
                            .col(ColumnDef::new(Societes::Siret).string_len(14).null())
                            .col(
                                ColumnDef::new(Societes::Status)
                                    .string_len(16)
                                    .not_null()
                                    .default("ACTIVE"),
                            )
                            .col(ColumnDef::new(Societes::DatabaseName).string_len(100).null())
                            .col(ColumnDef::new(Societes::Configuration).json().null()),
                    )
                    .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Societes::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    pub(crate) enum Societes {
        Table,
        Id,
        Code,
        Nom,
        Siret,
        Status,
        DatabaseName,
        Configuration,
    }
}

mod m20250101_000002_create_articles_table {
    use super::m20250101_000001_create_societes_table::Societes;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000002_create_articles_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    with_audit_columns(
                        Table::create()
                            .table(Articles::Table)
                            .if_not_exists()
                            .col(ColumnDef::new(Articles::Id).uuid().not_null().primary_key())
                            .col(ColumnDef::new(Articles::SocieteId).uuid().not_null())
                            .col(ColumnDef::new(Articles::Reference).string_len(30).not_null())
                            .col(ColumnDef::new(Articles::Designation).string_len(255).not_null())
                            .col(ColumnDef::new(Articles::Description).text().null())
                            .col(ColumnDef::new(Articles::Type).string_len(32).not_null())
                            .col(ColumnDef::new(Articles::Status).string_len(32).not_null())
                            .col(ColumnDef::new(Articles::Famille).string_len(50).null())
                            .col(ColumnDef::new(Articles::SousFamille).string_len(50).null())
                            .col(ColumnDef::new(Articles::UniteStock).string_len(10).not_null())
                            .col(ColumnDef::new(Articles::UniteAchat).string_len(10).null())
                            .col(ColumnDef::new(Articles::UniteVente).string_len(10).null())
                            .col(
                                ColumnDef::new(Articles::CoefficientAchat)
                                    .decimal_len(12, 4)
                                    .not_null()
                                    .default(1),
                            )
                            .col(
                                ColumnDef::new(Articles::CoefficientVente)
                                    .decimal_len(12, 4)
                                    .not_null()
                                    .default(1),
                            )
                            .col(ColumnDef::new(Articles::PrixAchatStandard).decimal_len(15, 4).null())
                            .col(ColumnDef::new(Articles::PrixVenteHt).decimal_len(15, 4).null())
                            .col(ColumnDef::new(Articles::TauxTva).decimal_len(5, 2).null())
                            .col(ColumnDef::new(Articles::Poids).decimal_len(15, 4).null())
                            .col(ColumnDef::new(Articles::Volume).decimal_len(15, 6).null())
                            .col(ColumnDef::new(Articles::Longueur).decimal_len(12, 2).null())
                            .col(ColumnDef::new(Articles::Largeur).decimal_len(12, 2).null())
                            .col(ColumnDef::new(Articles::Hauteur).decimal_len(12, 2).null())
                            .foreign_key(
                                ForeignKey::create()
                                    .name("fk_articles_societe")
                                    .from(Articles::Table, Articles::SocieteId)
                                    .to(Societes::Table, Societes::Id)
                                    .on_delete(ForeignKeyAction::Cascade),
                            ),
                    )
                    .to_owned(),
                )
                .await?;

            manager
                .create_index(
                    index(
                        "idx_articles_societe_reference",
                        Articles::Table,
                        vec![Articles::SocieteId.into_iden(), Articles::Reference.into_iden()],
                    )
                    .unique()
                    .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_articles_famille",
                    Articles::Table,
                    vec![Articles::Famille.into_iden()],
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(Articles::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum Articles {
        Table,
        Id,
        SocieteId,
        Reference,
        Designation,
        Description,
        Type,
        Status,
        Famille,
        SousFamille,
        UniteStock,
        UniteAchat,
        UniteVente,
        CoefficientAchat,
        CoefficientVente,
        PrixAchatStandard,
        PrixVenteHt,
        TauxTva,
        Poids,
        Volume,
        Longueur,
        Largeur,
        Hauteur,
    }
}

mod m20250101_000003_create_price_rules_table {
    use super::m20250101_000001_create_societes_table::Societes;
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000003_create_price_rules_table"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    with_audit_columns(
                        Table::create()
                            .table(PriceRules::Table)
                            .if_not_exists()
                            .col(ColumnDef::new(PriceRules::Id).uuid().not_null().primary_key())
                            .col(ColumnDef::new(PriceRules::SocieteId).uuid().not_null())
                            .col(ColumnDef::new(PriceRules::RuleName).string_len(255).not_null())
                            .col(ColumnDef::new(PriceRules::Description).text().null())
                            .col(
                                ColumnDef::new(PriceRules::IsActive)
                                    .boolean()
                                    .not_null()
                                    .default(true),
                            )
                            .col(
                                ColumnDef::new(PriceRules::Channel)
                                    .string_len(16)
                                    .not_null()
                                    .default("ALL"),
                            )
                            .col(ColumnDef::new(PriceRules::AdjustmentType).string_len(32).not_null())
                            .col(
                                ColumnDef::new(PriceRules::AdjustmentValue)
                                    .decimal_len(15, 4)
                                    .not_null()
                                    .default(0),
                            )
                            .col(ColumnDef::new(PriceRules::AdjustmentUnit).string_len(10).null())
                            .col(ColumnDef::new(PriceRules::Formula).text().null())
                            .col(ColumnDef::new(PriceRules::Conditions).json().not_null())
                            .col(
                                ColumnDef::new(PriceRules::Priority)
                                    .integer()
                                    .not_null()
                                    .default(0),
                            )
                            .col(
                                ColumnDef::new(PriceRules::Combinable)
                                    .boolean()
                                    .not_null()
                                    .default(true),
                            )
                            .col(ColumnDef::new(PriceRules::ValidFrom).timestamp_with_time_zone().null())
                            .col(ColumnDef::new(PriceRules::ValidUntil).timestamp_with_time_zone().null())
                            .col(ColumnDef::new(PriceRules::UsageLimit).integer().null())
                            .col(ColumnDef::new(PriceRules::UsageLimitPerCustomer).integer().null())
                            .col(
                                ColumnDef::new(PriceRules::UsageCount)
                                    .integer()
                                    .not_null()
                                    .default(0),
                            )
                            .col(ColumnDef::new(PriceRules::ArticleId).uuid().null())
                            .col(ColumnDef::new(PriceRules::ArticleFamily).string_len(50).null())
                            .col(ColumnDef::new(PriceRules::CustomerGroups).json().not_null())
                            .col(ColumnDef::new(PriceRules::Metadata).json().null())
                            .foreign_key(
                                ForeignKey::create()
                                    .name("fk_price_rules_societe")
                                    .from(PriceRules::Table, PriceRules::SocieteId)
                                    .to(Societes::Table, Societes::Id)
                                    .on_delete(ForeignKeyAction::Cascade),
                            ),
                    )
                    .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_price_rules_societe_active",
                    PriceRules::Table,
                    vec![PriceRules::SocieteId.into_iden(), PriceRules::IsActive.into_iden()],
                ))
                .await?;

            manager
                .create_index(index(
                    "idx_price_rules_priority",
                    PriceRules::Table,
                    vec![PriceRules::Priority.into_iden()],
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(PriceRules::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum PriceRules {
        Table,
        Id,
        SocieteId,
        RuleName,
        Description,
        IsActive,
        Channel,
        AdjustmentType,
        AdjustmentValue,
        AdjustmentUnit,
        Formula,
        Conditions,
        Priority,
        Combinable,
        ValidFrom,
        ValidUntil,
        UsageLimit,
        UsageLimitPerCustomer,
        UsageCount,
        ArticleId,
        ArticleFamily,
        CustomerGroups,
        Metadata,
    }
}

mod m20250101_000004_create_menu_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000004_create_menu_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    with_audit_columns(
                        Table::create()
                            .table(MenuConfigurations::Table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(MenuConfigurations::Id)
                                    .uuid()
                                    .not_null()
                                    .primary_key(),
                            )
                            .col(
                                ColumnDef::new(MenuConfigurations::Name)
                                    .string_len(100)
                                    .not_null()
                                    .unique_key(),
                            )
                            .col(ColumnDef::new(MenuConfigurations::Description).text().null())
                            .col(
                                ColumnDef::new(MenuConfigurations::IsActive)
                                    .boolean()
                                    .not_null()
                                    .default(false),
                            )
                            .col(
                                ColumnDef::new(MenuConfigurations::IsSystem)
                                    .boolean()
                                    .not_null()
                                    .default(false),
                            )
                            .col(ColumnDef::new(MenuConfigurations::SocieteId).uuid().null()),
                    )
                    .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    with_audit_columns(
                        Table::create()
                            .table(MenuItems::Table)
                            .if_not_exists()
                            .col(ColumnDef::new(MenuItems::Id).uuid().not_null().primary_key())
                            .col(ColumnDef::new(MenuItems::ConfigId).uuid().not_null())
                            .col(ColumnDef::new(MenuItems::ParentId).uuid().null())
                            .col(ColumnDef::new(MenuItems::Title).string_len(255).not_null())
                            .col(ColumnDef::new(MenuItems::Type).string_len(16).not_null())
                            .col(ColumnDef::new(MenuItems::ProgramId).string_len(255).null())
                            .col(ColumnDef::new(MenuItems::ExternalUrl).string_len(2048).null())
                            .col(ColumnDef::new(MenuItems::QueryBuilderId).string_len(255).null())
                            .col(ColumnDef::new(MenuItems::Icon).string_len(100).null())
                            .col(
                                ColumnDef::new(MenuItems::OrderIndex)
                                    .integer()
                                    .not_null()
                                    .default(0),
                            )
                            .col(
                                ColumnDef::new(MenuItems::IsVisible)
                                    .boolean()
                                    .not_null()
                                    .default(true),
                            )
                            .col(
                                ColumnDef::new(MenuItems::OpenInNewTab)
                                    .boolean()
                                    .not_null()
                                    .default(false),
                            )
                            .col(ColumnDef::new(MenuItems::RequiredRoles).json().not_null())
                            .col(ColumnDef::new(MenuItems::RequiredPermissions).json().not_null())
                            .foreign_key(
                                ForeignKey::create()
                                    .name("fk_menu_items_config")
                                    .from(MenuItems::Table, MenuItems::ConfigId)
                                    .to(MenuConfigurations::Table, MenuConfigurations::Id)
                                    .on_delete(ForeignKeyAction::Cascade),
                            ),
                    )
                    .to_owned(),
                )
                .await?;

            manager
                .create_index(index(
                    "idx_menu_items_config_parent",
                    MenuItems::Table,
                    vec![MenuItems::ConfigId.into_iden(), MenuItems::ParentId.into_iden()],
                ))
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .drop_table(Table::drop().table(MenuItems::Table).to_owned())
                .await?;
            manager
                .drop_table(Table::drop().table(MenuConfigurations::Table).to_owned())
                .await
        }
    }

    #[derive(DeriveIden)]
    enum MenuConfigurations {
        Table,
        Id,
        Name,
        Description,
        IsActive,
        IsSystem,
        SocieteId,
    }

    #[derive(DeriveIden)]
    enum MenuItems {
        Table,
        Id,
        ConfigId,
        ParentId,
        Title,
        Type,
        ProgramId,
        ExternalUrl,
        QueryBuilderId,
        Icon,
        OrderIndex,
        IsVisible,
        OpenInNewTab,
        RequiredRoles,
        RequiredPermissions,
    }
}

mod m20250101_000005_create_shared_catalog_tables {
    use super::*;

    pub struct Migration;

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20250101_000005_create_shared_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            manager
                .create_table(
                    with_audit_columns(
                        Table::create()
                            .table(SharedMaterials::Table)
                            .if_not_exists()
                            .col(ColumnDef::new(SharedMaterials::Id).uuid().not_null().primary_key())
                            .col(
                                ColumnDef::new(SharedMaterials::Code)
                                    .string_len(50)
                                    .not_null()
                                    .unique_key(),
                            )
                            .col(ColumnDef::new(SharedMaterials::Nom).string_len(255).not_null())
                            .col(ColumnDef::new(SharedMaterials::Description).text().null())
                            .col(ColumnDef::new(SharedMaterials::Type).string_len(16).not_null())
                            .col(ColumnDef::new(SharedMaterials::Forme).string_len(16).null())
                            .col(ColumnDef::new(SharedMaterials::Nuance).string_len(50).null())
                            .col(ColumnDef::new(SharedMaterials::Norme).string_len(50).null())
                            .col(ColumnDef::new(SharedMaterials::Caracteristiques).json().null())
                            .col(ColumnDef::new(SharedMaterials::Dimensions).json().null())
                            .col(ColumnDef::new(SharedMaterials::Metadata).json().null()),
                    )
                    .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    with_audit_columns(
                        Table::create()
                            .table(SharedProcesses::Table)
                            .if_not_exists()
                            .col(ColumnDef::new(SharedProcesses::Id).uuid().not_null().primary_key())
                            .col(
                                ColumnDef::new(SharedProcesses::Code)
                                    .string_len(50)
                                    .not_null()
                                    .unique_key(),
                            )
                            .col(ColumnDef::new(SharedProcesses::Nom).string_len(255).not_null())
                            .col(ColumnDef::new(SharedProcesses::Description).text().null())
                            .col(ColumnDef::new(SharedProcesses::Type).string_len(16).not_null())
                            .col(ColumnDef::new(SharedProcesses::Complexite).string_len(16).null())
                            .col(ColumnDef::new(SharedProcesses::Etapes).json().null())
                            .col(ColumnDef::new(SharedProcesses::Equipements).json().null())
                            .col(ColumnDef::new(SharedProcesses::DureeEstimeeMinutes).integer().null())
                            .col(ColumnDef::new(SharedProcesses::Metadata).json().null()),
                    )
                    .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    with_audit_columns(
                        Table::create()
                            .table(SharedQualityStandards::Table)
                            .if_not_exists()
                            .col(
                                ColumnDef::new(SharedQualityStandards::Id)
                                    .uuid()
                                    .not_null()
                                    .primary_key(),
                            )
                            .col(
                                ColumnDef::new(SharedQualityStandards::Code)
                                    .string_len(50)
                                    .not_null()
                                    .unique_key(),
                            )
                            .col(ColumnDef::new(SharedQualityStandards::Nom).string_len(255).not_null())
                            .col(ColumnDef::new(SharedQualityStandards::Description).text().null())
                            .col(ColumnDef::new(SharedQualityStandards::Type).string_len(16).not_null())
                            .col(ColumnDef::new(SharedQualityStandards::Domaines).json().not_null())
                            .col(ColumnDef::new(SharedQualityStandards::DatePublication).date().null())
                            .col(ColumnDef::new(SharedQualityStandards::DateApplication).date().null())
                            .col(ColumnDef::new(SharedQualityStandards::Criteres).json().null())
                            .col(ColumnDef::new(SharedQualityStandards::Metadata).json().null()),
                    )
                    .to_owned(),
                )
                .await?;

            manager
                .create_table(
                    with_audit_columns(
                        Table::create()
                            .table(SharedSuppliers::Table)
                            .if_not_exists()
                            .col(ColumnDef::new(SharedSuppliers::Id).uuid().not_null().primary_key())
                            .col(
                                ColumnDef::new(SharedSuppliers::Code)
                                    .string_len(50)
                                    .not_null()
                                    .unique_key(),
                            )
                            .col(ColumnDef::new(SharedSuppliers::RaisonSociale).string_len(255).not_null())
                            .col(ColumnDef::new(SharedSuppliers::NomCommercial).string_len(255).null())
                            .col(ColumnDef::new(SharedSuppliers::Siret).string_len(14).null())
                            .col(ColumnDef::new(SharedSuppliers::NumeroTva).string_len(20).null())
                            .col(ColumnDef::new(SharedSuppliers::Type).string_len(16).not_null())
                            .col(ColumnDef::new(SharedSuppliers::Categories).json().not_null())
                            .col(ColumnDef::new(SharedSuppliers::Coordonnees).json().null())
                            .col(ColumnDef::new(SharedSuppliers::Contacts).json().null())
                            .col(ColumnDef::new(SharedSuppliers::Metadata).json().null()),
                    )
                    .to_owned(),
                )
                .await
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in [
                SharedSuppliers::Table.into_iden(),
                SharedQualityStandards::Table.into_iden(),
                SharedProcesses::Table.into_iden(),
                SharedMaterials::Table.into_iden(),
            ] {
                manager
                    .drop_table(Table::drop().table(table).to_owned())
                    .await?;
            }
            Ok(())
        }
    }

    #[derive(DeriveIden)]
    enum SharedMaterials {
        Table,
        Id,
        Code,
        Nom,
        Description,
        Type,
        Forme,
        Nuance,
        Norme,
        Caracteristiques,
        Dimensions,
        Metadata,
    }

    #[derive(DeriveIden)]
    enum SharedProcesses {
        Table,
        Id,
        Code,
        Nom,
        Description,
        Type,
        Complexite,
        Etapes,
        Equipements,
        DureeEstimeeMinutes,
        Metadata,
    }

    #[derive(DeriveIden)]
    enum SharedQualityStandards {
        Table,
        Id,
        Code,
        Nom,
        Description,
        Type,
        Domaines,
        DatePublication,
        DateApplication,
        Criteres,
        Metadata,
    }

    #[derive(DeriveIden)]
    enum SharedSuppliers {
        Table,
        Id,
        Code,
        RaisonSociale,
        NomCommercial,
        Siret,
        NumeroTva,
        Type,
        Categories,
        Coordonnees,
        Contacts,
        Metadata,
    }
}
