//! Terraform scaffold for a single EC2 host.
//!
//! The root module declares the aws/tls/local providers and calls a local
//! `ec2` module that generates a key pair, a security group, looks up the
//! latest Ubuntu AMI and launches the instance. Only the root `variables.tf`
//! and `providers.tf` carry substituted values; the module itself is static.

use regex::Regex;
use serde::Serialize;
use std::net::Ipv4Addr;
use std::sync::OnceLock;

use crate::error::{Error, Result};
use crate::scaffold::ScaffoldFile;
use crate::utils::template::{self, TemplateVars};
use crate::utils::validation;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TerraformSettings {
    pub region: String,
    pub instance_type: String,
    pub key_name: String,
    pub instance_name: String,
    pub ssh_cidr: String,
    pub app_port: u16,
    pub aws_provider_version: String,
}

fn region_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z]{2}(-[a-z]+)+-\d+$").unwrap())
}

fn instance_type_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[a-z][a-z0-9-]*\.[a-z0-9]+$").unwrap())
}

fn key_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9._-]{1,255}$").unwrap())
}

fn instance_name_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9 ._-]{0,62}$").unwrap())
}

fn provider_version_pattern() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[~><=!]*\s*\d+(\.\d+){0,2}$").unwrap())
}

impl TerraformSettings {
    pub fn validate(&self) -> Result<()> {
        validation::require_match(
            &self.region,
            region_pattern(),
            "region",
            "Region must look like 'us-east-1'",
        )?;
        validation::require_match(
            &self.instance_type,
            instance_type_pattern(),
            "instance_type",
            "Instance type must look like 't2.micro'",
        )?;
        validation::require_match(
            &self.key_name,
            key_name_pattern(),
            "key_name",
            "Key name may only contain letters, digits, '.', '_' and '-'",
        )?;
        validation::require_match(
            &self.instance_name,
            instance_name_pattern(),
            "instance_name",
            "Instance name must start with a letter or digit and use letters, digits, spaces, '.', '_' or '-'",
        )?;
        validation::require_match(
            &self.aws_provider_version,
            provider_version_pattern(),
            "aws_provider_version",
            "Provider version must be a constraint like '~> 5.0'",
        )?;
        validate_cidr(&self.ssh_cidr)?;
        validation::require_port(u32::from(self.app_port), "app_port")?;
        Ok(())
    }

    fn variables(&self) -> Vec<(&'static str, String)> {
        vec![
            (TemplateVars::REGION, self.region.clone()),
            (TemplateVars::INSTANCE_TYPE, self.instance_type.clone()),
            (TemplateVars::KEY_NAME, self.key_name.clone()),
            (TemplateVars::INSTANCE_NAME, self.instance_name.clone()),
            (TemplateVars::SSH_CIDR, self.ssh_cidr.clone()),
            (TemplateVars::APP_PORT, self.app_port.to_string()),
            (
                TemplateVars::AWS_PROVIDER_VERSION,
                self.aws_provider_version.clone(),
            ),
        ]
    }
}

fn validate_cidr(cidr: &str) -> Result<()> {
    let invalid = || {
        Error::validation_invalid_argument(
            "ssh_cidr",
            "SSH CIDR must be an IPv4 block like '203.0.113.0/24'",
            Some(cidr.to_string()),
        )
    };

    let (addr, prefix) = cidr.split_once('/').ok_or_else(invalid)?;
    addr.parse::<Ipv4Addr>().map_err(|_| invalid())?;
    match prefix.parse::<u8>() {
        Ok(p) if p <= 32 => Ok(()),
        _ => Err(invalid()),
    }
}

/// Validate settings and render every Terraform file of the scaffold.
pub fn render(settings: &TerraformSettings) -> Result<Vec<ScaffoldFile>> {
    settings.validate()?;

    let owned = settings.variables();
    let vars: Vec<(&str, &str)> = owned.iter().map(|(k, v)| (*k, v.as_str())).collect();

    let files = TEMPLATES
        .iter()
        .map(|(path, body)| ScaffoldFile::new(*path, template::render(body, &vars)))
        .collect::<Vec<_>>();

    for file in &files {
        let left = template::unresolved(&file.content);
        if !left.is_empty() {
            return Err(Error::internal_unexpected(format!(
                "Unresolved placeholders in {}: {}",
                file.relative_path.display(),
                left.join(", ")
            )));
        }
    }

    Ok(files)
}

const TEMPLATES: &[(&str, &str)] = &[
    ("providers.tf", PROVIDERS_TF),
    ("variables.tf", VARIABLES_TF),
    ("main.tf", MAIN_TF),
    ("outputs.tf", OUTPUTS_TF),
    ("modules/ec2/main.tf", MODULE_MAIN_TF),
    ("modules/ec2/variables.tf", MODULE_VARIABLES_TF),
    ("modules/ec2/outputs.tf", MODULE_OUTPUTS_TF),
    (".gitignore", GITIGNORE),
];

const PROVIDERS_TF: &str = r#"terraform {
  required_version = ">= 1.3.0"

  required_providers {
    aws = {
      source  = "hashicorp/aws"
      version = "{{aws_provider_version}}"
    }
    tls = {
      source  = "hashicorp/tls"
      version = "~> 4.0"
    }
    local = {
      source  = "hashicorp/local"
      version = "~> 2.4"
    }
  }
}

provider "aws" {
  region = var.region
}
"#;

const VARIABLES_TF: &str = r#"variable "region" {
  description = "AWS region to deploy into"
  type        = string
  default     = "{{region}}"
}

variable "instance_type" {
  description = "EC2 instance type"
  type        = string
  default     = "{{instance_type}}"
}

variable "key_name" {
  description = "Name of the generated EC2 key pair"
  type        = string
  default     = "{{key_name}}"
}

variable "instance_name" {
  description = "Value of the Name tag on the instance"
  type        = string
  default     = "{{instance_name}}"
}

variable "ssh_cidr" {
  description = "CIDR block allowed to reach port 22"
  type        = string
  default     = "{{ssh_cidr}}"
}

variable "app_port" {
  description = "Port the application container listens on"
  type        = number
  default     = {{app_port}}
}
"#;

const MAIN_TF: &str = r#"module "ec2" {
  source = "./modules/ec2"

  instance_type = var.instance_type
  key_name      = var.key_name
  instance_name = var.instance_name
  ssh_cidr      = var.ssh_cidr
  app_port      = var.app_port
}
"#;

const OUTPUTS_TF: &str = r#"output "instance_id" {
  value = module.ec2.instance_id
}

output "public_ip" {
  value = module.ec2.public_ip
}

output "public_dns" {
  value = module.ec2.public_dns
}

output "private_key_path" {
  value = module.ec2.private_key_path
}
"#;

const MODULE_MAIN_TF: &str = r#"resource "tls_private_key" "this" {
  algorithm = "RSA"
  rsa_bits  = 4096
}

resource "aws_key_pair" "this" {
  key_name   = var.key_name
  public_key = tls_private_key.this.public_key_openssh
}

resource "local_file" "private_key" {
  content         = tls_private_key.this.private_key_pem
  filename        = "${path.root}/${var.key_name}.pem"
  file_permission = "0400"
}

data "aws_ami" "ubuntu" {
  most_recent = true
  owners      = ["099720109477"]

  filter {
    name   = "name"
    values = ["ubuntu/images/hvm-ssd/ubuntu-jammy-22.04-amd64-server-*"]
  }

  filter {
    name   = "virtualization-type"
    values = ["hvm"]
  }

  filter {
    name   = "root-device-type"
    values = ["ebs"]
  }
}

resource "aws_security_group" "this" {
  name        = "${var.instance_name}-sg"
  description = "SSH, HTTP and application access for ${var.instance_name}"

  ingress {
    description = "SSH"
    from_port   = 22
    to_port     = 22
    protocol    = "tcp"
    cidr_blocks = [var.ssh_cidr]
  }

  ingress {
    description = "HTTP"
    from_port   = 80
    to_port     = 80
    protocol    = "tcp"
    cidr_blocks = ["0.0.0.0/0"]
  }

  dynamic "ingress" {
    for_each = contains([22, 80], var.app_port) ? [] : [var.app_port]
    content {
      description = "Application"
      from_port   = ingress.value
      to_port     = ingress.value
      protocol    = "tcp"
      cidr_blocks = ["0.0.0.0/0"]
    }
  }

  egress {
    from_port   = 0
    to_port     = 0
    protocol    = "-1"
    cidr_blocks = ["0.0.0.0/0"]
  }

  tags = {
    Name = "${var.instance_name}-sg"
  }
}

resource "aws_instance" "this" {
  ami                    = data.aws_ami.ubuntu.id
  instance_type          = var.instance_type
  key_name               = aws_key_pair.this.key_name
  vpc_security_group_ids = [aws_security_group.this.id]

  tags = {
    Name = var.instance_name
  }
}
"#;

const MODULE_VARIABLES_TF: &str = r#"variable "instance_type" {
  type = string
}

variable "key_name" {
  type = string
}

variable "instance_name" {
  type = string
}

variable "ssh_cidr" {
  type = string
}

variable "app_port" {
  type = number
}
"#;

const MODULE_OUTPUTS_TF: &str = r#"output "instance_id" {
  value = aws_instance.this.id
}

output "public_ip" {
  value = aws_instance.this.public_ip
}

output "public_dns" {
  value = aws_instance.this.public_dns
}

output "private_key_path" {
  value = local_file.private_key.filename
}
"#;

const GITIGNORE: &str = r#".terraform/
*.tfstate
*.tfstate.*
crash.log
*.pem
"#;
