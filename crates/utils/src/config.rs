use clap::Parser;

#[derive(clap::ValueEnum, Clone, Debug, Copy, PartialEq, Eq)]
#[clap(rename_all = "lowercase")]
pub enum CargoEnv {
    Development,
    Production,
}

/// 环境配置加载器
pub struct EnvLoader;

impl EnvLoader {
    /// 根据 CARGO_ENV 加载对应的环境配置文件
    pub fn load_env_file() -> Result<(), Box<dyn std::error::Error>> {
        let cargo_env = std::env::var("CARGO_ENV").unwrap_or_else(|_| "development".to_string());
        let env_file = Self::env_file_for(&cargo_env);

        if !std::path::Path::new(env_file).exists() {
            eprintln!("⚠️  配置文件 {} 不存在，尝试加载默认的 .env 文件", env_file);
            if std::path::Path::new(".env").exists() {
                dotenvy::from_filename(".env")?;
                println!("✅ 已加载默认配置文件: .env");
            } else {
                eprintln!("❌ 未找到任何配置文件，使用默认配置");
            }
            return Ok(());
        }

        dotenvy::from_filename(env_file)?;
        println!("✅ 已加载环境配置文件: {} (CARGO_ENV={})", env_file, cargo_env);

        Ok(())
    }

    /// CARGO_ENV -> 配置文件名
    pub fn env_file_for(cargo_env: &str) -> &'static str {
        match cargo_env {
            "production" | "Production" | "prod" => ".env.production",
            "development" | "Development" | "dev" => ".env.development",
            "test" | "Test" => ".env.test",
            _ => {
                println!("⚠️  未知的 CARGO_ENV: {}，使用默认的 .env.development", cargo_env);
                ".env.development"
            }
        }
    }
}

#[derive(clap::Parser, Clone, Debug)]
pub struct AppConfig {
    #[clap(long, env, value_enum)]
    pub cargo_env: CargoEnv,

    #[clap(long, env, default_value = "0.0.0.0")]
    pub app_host: String,

    #[clap(long, env, default_value = "8000")]
    pub app_port: u16,

    #[clap(long, env, default_value = "mongodb://localhost:27017")]
    pub mongo_uri: String,

    #[clap(long, env)]
    pub mongo_db: String,

    /// JWT签名密钥
    #[clap(long, env)]
    pub jwt_secret: String,

    #[clap(long, env, default_value = "168")]
    pub jwt_expires_in_hours: u64,

    /// 前端地址，用于支付回调跳转
    #[clap(long, env, default_value = "http://localhost:3000")]
    pub frontend_url: String,

    #[clap(long, env, default_value = "https://api.flutterwave.com")]
    pub flutterwave_base_url: String,

    #[clap(long, env, default_value = "")]
    pub flutterwave_secret_key: String,

    /// Flutterwave webhook `verif-hash` 头部的期望值
    #[clap(long, env)]
    pub flutterwave_webhook_hash: Option<String>,

    /// 激活账户需要支付的金额
    #[clap(long, env, default_value = "5000")]
    pub activation_fee: i64,

    #[clap(long, env, default_value = "NGN")]
    pub payment_currency: String,

    /// 直推（一级）奖励，激活时直接计入推荐人余额
    #[clap(long, env, default_value = "2800")]
    pub referral_level1_bonus: i64,

    #[clap(long, env, default_value = "1100")]
    pub referral_level2_bonus: i64,

    #[clap(long, env, default_value = "700")]
    pub referral_level3_bonus: i64,

    #[clap(long, env, default_value = "1000")]
    pub min_withdrawal_amount: i64,

    #[clap(long, env, default_value = "")]
    pub cloudinary_cloud_name: String,

    #[clap(long, env, default_value = "")]
    pub cloudinary_api_key: String,

    #[clap(long, env, default_value = "")]
    pub cloudinary_api_secret: String,

    #[clap(long, env, default_value = "info")]
    pub rust_log: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        EnvLoader::load_env_file().ok();
        AppConfig::parse()
    }
}

impl AppConfig {
    /// 手动创建配置实例（用于测试）
    pub fn new_for_test() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            app_host: "0.0.0.0".to_string(),
            app_port: 8765,
            mongo_uri: std::env::var("MONGO_URI").unwrap_or_else(|_| "mongodb://localhost:27017".to_string()),
            mongo_db: std::env::var("MONGO_DB").unwrap_or_else(|_| "test_db".to_string()),
            jwt_secret: "test_secret_key_for_jwt_testing_only".to_string(),
            jwt_expires_in_hours: 24,
            frontend_url: "http://localhost:3000".to_string(),
            flutterwave_base_url: "https://api.flutterwave.com".to_string(),
            flutterwave_secret_key: "FLWSECK_TEST-secret".to_string(),
            flutterwave_webhook_hash: Some("test-webhook-hash".to_string()),
            activation_fee: 5000,
            payment_currency: "NGN".to_string(),
            referral_level1_bonus: 2800,
            referral_level2_bonus: 1100,
            referral_level3_bonus: 700,
            min_withdrawal_amount: 1000,
            cloudinary_cloud_name: "demo".to_string(),
            cloudinary_api_key: "123456".to_string(),
            cloudinary_api_secret: "cloudinary-secret".to_string(),
            rust_log: "info".to_string(),
        }
    }

    pub fn is_production(&self) -> bool {
        self.cargo_env == CargoEnv::Production
    }
}
